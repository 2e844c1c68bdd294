//! Candidate-source exhaustion
//!
//! A record may list several experimental structures, best first. Each is
//! tried in order until one yields a measurement; a structure that failed
//! once is never tried again for the same record. When the list runs out
//! (or was never there) the predicted model is tried exactly once.

use ahash::AHashSet;
use amide_host::{GeometryEngine, Preparation, ResidueLocator, StructureSource};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::measure::{analyze_structure, AnalysisOptions, ResidueAnalysis};
use crate::target::AnalysisTarget;

/// One experimental structure offered for a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub pdb_id: String,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub experimental_method: Option<String>,
}

/// Where a successful measurement came from
#[derive(Debug, Clone, PartialEq)]
pub enum MeasuredOn {
    /// One of the candidates
    Candidate(CandidateSource),
    /// The predicted model
    Predicted,
}

/// Successful measurement of a record
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSuccess {
    pub measured_on: MeasuredOn,
    pub analysis: ResidueAnalysis,
}

/// Everything that happened while working through a record's candidates
#[derive(Debug)]
pub struct CandidateReport {
    /// One message per failed candidate, in attempt order
    pub attempt_errors: Vec<String>,
    /// Set when a non-empty list was exhausted
    pub exhaustion: Option<String>,
    /// Set when the predicted model failed too
    pub predicted_error: Option<String>,
    /// Number of candidates attempted
    pub tried: usize,
    pub result: AnalysisResult<CandidateSuccess>,
}

/// Try each candidate in order, then the predicted model
///
/// `candidates` of `None` or an empty list go straight to the predicted
/// model.
pub fn analyze_candidates(
    engine: &mut dyn GeometryEngine,
    accession: &str,
    position: i64,
    candidates: Option<&[CandidateSource]>,
    options: &AnalysisOptions,
) -> CandidateReport {
    let candidates = candidates.unwrap_or_default();
    let mut failed: AHashSet<&str> = AHashSet::new();
    let mut attempt_errors = Vec::new();
    let mut tried = 0;
    let mut last_chain: Option<&str> = None;

    for candidate in candidates {
        if failed.contains(candidate.pdb_id.as_str()) {
            log::debug!("{}: skipping {} (already failed)", accession, candidate.pdb_id);
            continue;
        }

        tried += 1;
        last_chain = candidate.chain_id.as_deref();
        let target = AnalysisTarget::new(accession, candidate.chain_id.clone(), position);
        let preparation = Preparation::stripped()
            .with_chain(candidate.chain_id.clone())
            .with_renumbering(true);
        let source = StructureSource::experimental(&candidate.pdb_id);

        match analyze_structure(engine, &source, &preparation, &target, options) {
            Ok(analysis) => {
                log::info!("{}: measured on {}", target, candidate.pdb_id);
                return CandidateReport {
                    attempt_errors,
                    exhaustion: None,
                    predicted_error: None,
                    tried,
                    result: Ok(CandidateSuccess {
                        measured_on: MeasuredOn::Candidate(candidate.clone()),
                        analysis,
                    }),
                };
            }
            Err(e) => {
                log::warn!("{}: {} failed: {}", target, candidate.pdb_id, e);
                attempt_errors.push(format!(
                    "Error in {}, {}, {}: {}. Skipped all other attempts on this PDB file.",
                    candidate.pdb_id,
                    accession,
                    target.locator(),
                    e
                ));
                failed.insert(candidate.pdb_id.as_str());
            }
        }
    }

    let exhaustion = (!candidates.is_empty()).then(|| {
        format!(
            "ALL FAILED Error in {}, {}, tried {} files",
            accession,
            ResidueLocator::new(last_chain, position),
            candidates.len()
        )
    });

    let target = AnalysisTarget::new(accession, None, position);
    let preparation = Preparation::stripped().with_renumbering(true);
    let source = StructureSource::predicted(accession);
    let (predicted_error, result) =
        match analyze_structure(engine, &source, &preparation, &target, options) {
            Ok(analysis) => (
                None,
                Ok(CandidateSuccess {
                    measured_on: MeasuredOn::Predicted,
                    analysis,
                }),
            ),
            Err(e) => {
                log::warn!("{}: predicted model failed: {}", target, e);
                let message = format!("ALPHAFOLD Error in {}, {}: {}", accession, target.locator(), e);
                let result = if candidates.is_empty() {
                    Err(e)
                } else {
                    Err(AnalysisError::SourceExhausted { tried })
                };
                (Some(message), result)
            }
        };

    CandidateReport {
        attempt_errors,
        exhaustion,
        predicted_error,
        tried,
        result,
    }
}
