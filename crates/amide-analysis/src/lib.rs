//! Residue analysis for amide batch runs
//!
//! Given a geometry engine and a record's target residue, this crate decides
//! which structure and which residue to measure:
//!
//! - [`resolve_residue`] maps a requested position to an ASN/GLN residue,
//!   optionally one position earlier to account for a trimmed initiator
//!   methionine
//! - [`analyze_structure`] opens a source, measures the residue and always
//!   closes it again, switching to an alternate source when torsion angles
//!   are missing
//! - [`analyze_candidates`] works through a record's experimental structures
//!   before falling back to the predicted model

pub mod candidates;
pub mod error;
pub mod measure;
pub mod residue;
pub mod resolve;
pub mod retry;
pub mod target;

// Re-exports
pub use candidates::{
    analyze_candidates, CandidateReport, CandidateSource, CandidateSuccess, MeasuredOn,
};
pub use error::{AnalysisError, AnalysisResult};
pub use measure::{
    analyze_structure, measure_residue, with_structure, AnalysisOptions, ResidueAnalysis,
    TorsionMode,
};
pub use residue::{AmideResidue, ASN_REFERENCE_AREA, GLN_REFERENCE_AREA};
pub use resolve::{resolve_residue, ResolutionPolicy, ResolvedResidue};
pub use retry::retry_once;
pub use target::AnalysisTarget;
