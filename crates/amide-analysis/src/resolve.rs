//! Residue resolution with the N-terminal offset fallback
//!
//! Structures of mature proteins often lack the initiator methionine, so a
//! UniProt position can point one residue past the intended ASN/GLN. When
//! allowed, resolution retries at `position - 1`.

use amide_host::{GeometryEngine, ResidueLocator, StructureHandle};

use crate::error::{AnalysisError, AnalysisResult};
use crate::residue::AmideResidue;
use crate::retry::retry_once;
use crate::target::AnalysisTarget;

/// How strictly a requested position is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    /// Try `position - 1` when the requested residue is not ASN/GLN
    pub offset_fallback: bool,
}

impl ResolutionPolicy {
    /// Allow the offset fallback
    pub fn with_offset_fallback() -> Self {
        Self {
            offset_fallback: true,
        }
    }

    /// Positions are known to be exact
    pub fn exact() -> Self {
        Self {
            offset_fallback: false,
        }
    }
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::with_offset_fallback()
    }
}

/// A requested position mapped onto a concrete residue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResidue {
    pub kind: AmideResidue,
    pub chain: Option<String>,
    /// Position actually used; `target.position - 1` after the fallback
    pub position: i64,
    pub used_offset_fallback: bool,
}

impl ResolvedResidue {
    /// Locator of the resolved residue
    pub fn locator(&self) -> ResidueLocator {
        ResidueLocator::new(self.chain.as_deref(), self.position)
    }
}

/// Resolve a target position to an ASN/GLN residue of an open structure
pub fn resolve_residue(
    engine: &mut dyn GeometryEngine,
    handle: &StructureHandle,
    target: &AnalysisTarget,
    policy: ResolutionPolicy,
) -> AnalysisResult<ResolvedResidue> {
    let names = select(engine, handle, &target.locator())?;
    let Some(first) = names.first() else {
        return Err(AnalysisError::PositionNotFound(target.to_string()));
    };

    if let Some(kind) = AmideResidue::from_name(first) {
        return Ok(ResolvedResidue {
            kind,
            chain: target.chain.clone(),
            position: target.position,
            used_offset_fallback: false,
        });
    }

    let previous = target.position - 1;
    if !policy.offset_fallback || previous < 1 {
        return Err(AnalysisError::ResidueTypeMismatch(target.to_string()));
    }

    let names = select(
        engine,
        handle,
        &ResidueLocator::new(target.chain.as_deref(), previous),
    )?;
    match names.first().and_then(|name| AmideResidue::from_name(name)) {
        Some(kind) => {
            log::debug!(
                "{}: {} is {}, using {} at {}",
                target.identifier,
                target.position,
                first,
                kind,
                previous
            );
            Ok(ResolvedResidue {
                kind,
                chain: target.chain.clone(),
                position: previous,
                used_offset_fallback: true,
            })
        }
        None => Err(AnalysisError::ResidueTypeMismatch(target.to_string())),
    }
}

fn select(
    engine: &mut dyn GeometryEngine,
    handle: &StructureHandle,
    locator: &ResidueLocator,
) -> AnalysisResult<Vec<String>> {
    retry_once("select", || engine.select_residue(handle, locator))
}
