//! Geometry engine capability
//!
//! Everything geometric (surface area, distances, torsion angles) is
//! computed by an external engine. The analysis code only sees the
//! [`GeometryEngine`] trait, so it can run against a live host session or
//! against the in-memory engine used in tests.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::HostResult;

/// Where a structure comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureSource {
    /// Experimental structure, by PDB code or file path understood by the host
    Experimental {
        /// PDB code or path
        id: String,
    },
    /// Predicted model fetched by UniProt accession
    Predicted {
        /// UniProt accession
        accession: String,
    },
    /// Model file on local disk
    LocalFile {
        /// Path to the model file
        path: PathBuf,
    },
}

impl StructureSource {
    /// Experimental structure by PDB code or path
    pub fn experimental(id: impl Into<String>) -> Self {
        StructureSource::Experimental { id: id.into() }
    }

    /// Predicted model by UniProt accession
    pub fn predicted(accession: impl Into<String>) -> Self {
        StructureSource::Predicted {
            accession: accession.into(),
        }
    }

    /// Model file on disk
    pub fn local_file(path: impl Into<PathBuf>) -> Self {
        StructureSource::LocalFile { path: path.into() }
    }

    /// Whether this is a predicted (rather than experimental) model
    pub fn is_predicted(&self) -> bool {
        !matches!(self, StructureSource::Experimental { .. })
    }
}

impl fmt::Display for StructureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureSource::Experimental { id } => write!(f, "{}", id),
            StructureSource::Predicted { accession } => write!(f, "AlphaFold {}", accession),
            StructureSource::LocalFile { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Cleanup applied to a structure right after it is opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preparation {
    /// Delete every chain except this one
    pub keep_chain: Option<String>,
    /// Delete solvent
    pub strip_solvent: bool,
    /// Delete ligands
    pub strip_ligands: bool,
    /// Renumber residues to the UniProt reference sequence
    pub renumber_to_reference: bool,
}

impl Preparation {
    /// No cleanup at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Strip solvent and ligands
    pub fn stripped() -> Self {
        Self {
            strip_solvent: true,
            strip_ligands: true,
            ..Self::default()
        }
    }

    /// Keep only one chain
    pub fn with_chain(mut self, chain: Option<String>) -> Self {
        self.keep_chain = chain;
        self
    }

    /// Enable or disable renumbering to the reference sequence
    pub fn with_renumbering(mut self, renumber: bool) -> Self {
        self.renumber_to_reference = renumber;
        self
    }
}

/// An open structure inside an engine
///
/// Handles are owned by one analysis attempt and closed before the next one
/// starts.
#[derive(Debug, PartialEq, Eq)]
pub struct StructureHandle {
    model: u32,
    source: StructureSource,
}

impl StructureHandle {
    /// Wrap an engine model number
    pub fn new(model: u32, source: StructureSource) -> Self {
        Self { model, source }
    }

    /// Engine model number
    pub fn model(&self) -> u32 {
        self.model
    }

    /// Source this structure was opened from
    pub fn source(&self) -> &StructureSource {
        &self.source
    }
}

/// Address of one residue within a structure
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResidueLocator {
    /// Chain filter; `None` matches any chain
    pub chain: Option<String>,
    /// Sequence position
    pub position: i64,
}

impl ResidueLocator {
    /// Create a residue locator
    pub fn new(chain: Option<&str>, position: i64) -> Self {
        Self {
            chain: chain.map(str::to_string),
            position,
        }
    }

    /// Address an atom of this residue
    pub fn atom(&self, name: &str) -> AtomLocator {
        AtomLocator {
            residue: self.clone(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ResidueLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chain {
            Some(chain) => write!(f, "/{}@{}", chain, self.position),
            None => write!(f, "@{}", self.position),
        }
    }
}

/// Address of one atom within a structure
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomLocator {
    /// Residue holding the atom
    pub residue: ResidueLocator,
    /// Atom name (e.g. `ND2`, `C`)
    pub name: String,
}

/// Backbone torsion angles in degrees
///
/// An angle is `None` when it is undefined, e.g. phi of the first residue
/// of a chain or when the neighbouring residue is missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Torsion {
    /// Phi angle
    pub phi: Option<f64>,
    /// Psi angle
    pub psi: Option<f64>,
}

impl Torsion {
    /// Create a torsion pair
    pub fn new(phi: Option<f64>, psi: Option<f64>) -> Self {
        Self { phi, psi }
    }

    /// Whether both angles are defined
    pub fn is_complete(&self) -> bool {
        self.phi.is_some() && self.psi.is_some()
    }
}

/// Capability interface to the external geometry engine
///
/// Engines are driven strictly sequentially; implementations may keep
/// state between calls (the open models).
pub trait GeometryEngine {
    /// Open a structure and apply the requested cleanup
    fn open_structure(
        &mut self,
        source: &StructureSource,
        preparation: &Preparation,
    ) -> HostResult<StructureHandle>;

    /// Close a structure, releasing engine memory
    ///
    /// The handle stays valid for another close attempt if this fails.
    fn close_structure(&mut self, handle: &StructureHandle) -> HostResult<()>;

    /// Close every structure the engine holds, tracked or not
    fn close_all(&mut self) -> HostResult<()>;

    /// Names of the residues matching a locator; empty when none match
    fn select_residue(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<Vec<String>>;

    /// Distance in Å between two atoms
    fn compute_distance(
        &mut self,
        handle: &StructureHandle,
        from: &AtomLocator,
        to: &AtomLocator,
    ) -> HostResult<f64>;

    /// Solvent-excluded surface area in Å² of a residue
    fn compute_sesa(&mut self, handle: &StructureHandle, residue: &ResidueLocator)
        -> HostResult<f64>;

    /// Backbone phi/psi of a residue
    fn compute_backbone_torsion(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<Torsion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display() {
        assert_eq!(StructureSource::experimental("1a3n").to_string(), "1a3n");
        assert_eq!(
            StructureSource::predicted("P68871").to_string(),
            "AlphaFold P68871"
        );
        assert!(StructureSource::predicted("P68871").is_predicted());
        assert!(!StructureSource::experimental("1a3n").is_predicted());
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(ResidueLocator::new(Some("A"), 58).to_string(), "/A@58");
        assert_eq!(ResidueLocator::new(None, 58).to_string(), "@58");
    }

    #[test]
    fn test_torsion_completeness() {
        assert!(Torsion::new(Some(-60.0), Some(-45.0)).is_complete());
        assert!(!Torsion::new(None, Some(-45.0)).is_complete());
    }
}
