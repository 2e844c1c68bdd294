//! Measurement of one residue in one structure
//!
//! [`analyze_structure`] opens a source, resolves the target residue,
//! measures it and closes the structure again whatever happened. With
//! [`TorsionMode::SwitchTo`] a structure lacking phi/psi is replaced by an
//! alternate source and the whole measurement repeated there.

use amide_host::{
    GeometryEngine, Preparation, StructureHandle, StructureSource, Torsion,
};

use crate::error::{AnalysisError, AnalysisResult};
use crate::residue::{AmideResidue, CARBONYL_CARBON};
use crate::resolve::{resolve_residue, ResolutionPolicy, ResolvedResidue};
use crate::retry::retry_once;
use crate::target::AnalysisTarget;

/// Whether and how backbone torsion is measured
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TorsionMode {
    /// Do not measure phi/psi
    #[default]
    Skip,
    /// Measure phi/psi; undefined angles stay undefined
    Measure,
    /// Measure phi/psi and fall back to this source when either is undefined
    SwitchTo(StructureSource),
}

/// What to measure and how to resolve the residue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub policy: ResolutionPolicy,
    /// Measure amide distance and SES
    pub geometry: bool,
    pub torsion: TorsionMode,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::default(),
            geometry: true,
            torsion: TorsionMode::Skip,
        }
    }
}

/// Measurements of one resolved residue
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueAnalysis {
    /// Source the values were measured on
    pub source: StructureSource,
    pub kind: AmideResidue,
    /// Resolved position
    pub position: i64,
    /// Side-chain amide N to backbone C distance, Å
    pub distance: Option<f64>,
    /// Solvent-excluded surface area, Å²
    pub ses: Option<f64>,
    pub rel_sesa: Option<f64>,
    pub torsion: Option<Torsion>,
    pub used_offset_fallback: bool,
    pub switched_source: bool,
    /// Position used on the alternate source after a switch
    pub source_switch_position: Option<i64>,
}

impl ResidueAnalysis {
    fn has_complete_torsion(&self) -> bool {
        self.torsion.map_or(false, |t| t.is_complete())
    }
}

/// Measure an already resolved residue
pub fn measure_residue(
    engine: &mut dyn GeometryEngine,
    handle: &StructureHandle,
    resolved: &ResolvedResidue,
    options: &AnalysisOptions,
) -> AnalysisResult<ResidueAnalysis> {
    let residue = resolved.locator();

    let (distance, ses, rel_sesa) = if options.geometry {
        let nitrogen = residue.atom(resolved.kind.side_chain_nitrogen());
        let carbon = residue.atom(CARBONYL_CARBON);
        let distance = retry_once("distance", || {
            engine.compute_distance(handle, &nitrogen, &carbon)
        })?;
        let ses = retry_once("measure area", || engine.compute_sesa(handle, &residue))?;
        (Some(distance), Some(ses), Some(resolved.kind.rel_sesa(ses)))
    } else {
        (None, None, None)
    };

    let torsion = match options.torsion {
        TorsionMode::Skip => None,
        TorsionMode::Measure | TorsionMode::SwitchTo(_) => Some(retry_once("torsion", || {
            engine.compute_backbone_torsion(handle, &residue)
        })?),
    };

    Ok(ResidueAnalysis {
        source: handle.source().clone(),
        kind: resolved.kind,
        position: resolved.position,
        distance,
        ses,
        rel_sesa,
        torsion,
        used_offset_fallback: resolved.used_offset_fallback,
        switched_source: false,
        source_switch_position: None,
    })
}

/// Open a structure, run `body` on it and close it again
///
/// The structure is closed on the error path too; a failing close is
/// logged and does not mask the result of `body`. Whenever the host may
/// hold a model this function lost track of (an `open` whose reply never
/// arrived, a close that failed twice) every model is closed.
pub fn with_structure<T, F>(
    engine: &mut dyn GeometryEngine,
    source: &StructureSource,
    preparation: &Preparation,
    body: F,
) -> AnalysisResult<T>
where
    F: FnOnce(&mut dyn GeometryEngine, &StructureHandle) -> AnalysisResult<T>,
{
    let handle = open_tracked(engine, source, preparation)?;
    let result = body(&mut *engine, &handle);
    if let Err(e) = retry_once("close", || engine.close_structure(&handle)) {
        log::warn!("Failed to close {} (#{}): {}", source, handle.model(), e);
        release_all(engine);
    }
    result
}

/// Open with one retry, closing everything after a communication failure
fn open_tracked(
    engine: &mut dyn GeometryEngine,
    source: &StructureSource,
    preparation: &Preparation,
) -> AnalysisResult<StructureHandle> {
    match engine.open_structure(source, preparation) {
        Ok(handle) => Ok(handle),
        Err(e) if e.is_communication() => {
            log::warn!("Host call 'open' failed ({}), retrying once", e);
            release_all(engine);
            engine.open_structure(source, preparation).map_err(|e| {
                if e.is_communication() {
                    release_all(engine);
                }
                AnalysisError::from(e)
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Best-effort `close all`
fn release_all(engine: &mut dyn GeometryEngine) {
    if let Err(e) = engine.close_all() {
        log::warn!("Failed to close all models: {}", e);
    }
}

/// Resolve and measure a target residue on one source
pub fn analyze_structure(
    engine: &mut dyn GeometryEngine,
    source: &StructureSource,
    preparation: &Preparation,
    target: &AnalysisTarget,
    options: &AnalysisOptions,
) -> AnalysisResult<ResidueAnalysis> {
    let primary = with_structure(engine, source, preparation, |engine, handle| {
        let resolved = resolve_residue(engine, handle, target, options.policy)?;
        measure_residue(engine, handle, &resolved, options)
    })?;

    let TorsionMode::SwitchTo(alternate) = &options.torsion else {
        return Ok(primary);
    };
    if primary.has_complete_torsion() || alternate == source {
        return Ok(primary);
    }

    log::info!(
        "{}: torsion undefined on {}, switching to {}",
        target,
        source,
        alternate
    );
    switch_source(engine, alternate, preparation, target, options)
}

/// Repeat the measurement on the alternate source
///
/// Uses the requested position without a chain filter.
fn switch_source(
    engine: &mut dyn GeometryEngine,
    alternate: &StructureSource,
    preparation: &Preparation,
    target: &AnalysisTarget,
    options: &AnalysisOptions,
) -> AnalysisResult<ResidueAnalysis> {
    let target = target.without_chain();
    let preparation = preparation.clone().with_chain(None);
    let options = AnalysisOptions {
        torsion: TorsionMode::Measure,
        ..options.clone()
    };

    let mut analysis = analyze_structure(engine, alternate, &preparation, &target, &options)?;
    if !analysis.has_complete_torsion() {
        return Err(AnalysisError::TorsionUnavailable(target.to_string()));
    }

    analysis.switched_source = true;
    analysis.source_switch_position = Some(analysis.position);
    Ok(analysis)
}
