//! Per-mode mapping between table rows and analyses
//!
//! Each mode reads its input cells, runs the analysis it is configured for
//! and returns the output cells as one [`RowCommit`]. Nothing is written to
//! the table until the whole row has been computed.

use amide_analysis::{
    analyze_candidates, analyze_structure, AnalysisOptions, AnalysisTarget, CandidateSource,
    MeasuredOn, ResidueAnalysis, ResolutionPolicy, TorsionMode,
};
use amide_host::{GeometryEngine, Preparation, StructureSource};
use amide_io::{cell, ErrorEntry, RecordTable};
use serde_json::Value;

use crate::config::{ColumnNames, ModeConfig, ID_PLACEHOLDER};
use crate::error::RecordError;

/// Output cells of one row, applied to the table in a single step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowCommit {
    cells: Vec<(String, Value)>,
}

impl RowCommit {
    fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.cells.push((column.to_string(), value.into()));
    }

    /// Cells in the order they were computed
    pub fn cells(&self) -> &[(String, Value)] {
        &self.cells
    }

    /// Write every cell into `row`
    pub fn apply(self, table: &mut RecordTable, row: &str) {
        for (column, value) in self.cells {
            table.set(&column, row, value);
        }
    }
}

/// Result of processing one row
#[derive(Debug, Default)]
pub struct RowReport {
    /// Set when the row was analyzed successfully
    pub commit: Option<RowCommit>,
    /// Entries for the main error log
    pub errors: Vec<ErrorEntry>,
    /// Candidate list exhaustion
    pub all_failed: Option<ErrorEntry>,
    /// Predicted-model failure
    pub predicted_error: Option<ErrorEntry>,
}

impl RowReport {
    fn populated(commit: RowCommit) -> Self {
        Self {
            commit: Some(commit),
            ..Self::default()
        }
    }

    fn failed(identifier: &str, message: String) -> Self {
        Self {
            errors: vec![ErrorEntry::new(identifier, message)],
            ..Self::default()
        }
    }
}

/// Output columns a mode fills
pub fn output_columns(mode: &ModeConfig) -> Vec<&str> {
    let c = mode.columns();
    let geometry: [&str; 6] = [
        &c.analyzed_position,
        &c.analyzed_aa,
        &c.calculated_ses,
        &c.rel_sesa,
        &c.distance,
        &c.used_offset_fallback,
    ];
    let torsion: [&str; 2] = [&c.ramachandran_phi, &c.ramachandran_psi];

    let mut columns: Vec<&str> = Vec::new();
    match mode {
        ModeConfig::Candidates { .. } => {
            columns.extend(geometry);
            let provenance: [&str; 5] = [
                &c.is_experimental,
                &c.pdb_used,
                &c.pdb_chain,
                &c.pdb_resolution,
                &c.pdb_experimental_method,
            ];
            columns.extend(provenance);
        }
        ModeConfig::SingleSource { .. } => columns.extend(geometry),
        ModeConfig::Specific { .. } | ModeConfig::LocalPrediction { .. } => {
            columns.extend(geometry);
            columns.extend(torsion);
        }
        ModeConfig::Torsion { .. } => {
            columns.extend(torsion);
            columns.push(&c.switched_source);
            columns.push(&c.source_switch_position);
        }
    }
    columns
}

/// Analyze one row according to the mode
pub fn process_row(
    engine: &mut dyn GeometryEngine,
    mode: &ModeConfig,
    table: &RecordTable,
    row: &str,
) -> RowReport {
    let columns = mode.columns();
    if let ModeConfig::Candidates { .. } = mode {
        return process_candidates(engine, columns, table, row);
    }

    let identifier_column = mode.default_index_column();
    let identifier = cell::as_string(table.get(identifier_column, row)).unwrap_or_default();

    let plan = match plan_single(mode, columns, table, row, &identifier) {
        Ok(plan) => plan,
        Err(e) => {
            return RowReport::failed(&identifier, format!("Error in {}: {}", identifier, e));
        }
    };

    match analyze_structure(
        engine,
        &plan.source,
        &plan.preparation,
        &plan.target,
        &plan.options,
    ) {
        Ok(analysis) => {
            log::info!("Row {}: {} measured on {}", row, plan.target, analysis.source);
            let mut commit = RowCommit::default();
            if plan.options.geometry {
                commit_geometry(&mut commit, columns, &analysis);
            }
            if plan.options.torsion != TorsionMode::Skip {
                commit_torsion(&mut commit, columns, &analysis);
            }
            if let ModeConfig::Torsion { .. } = mode {
                commit.set(&columns.switched_source, analysis.switched_source);
                commit.set(
                    &columns.source_switch_position,
                    analysis.source_switch_position.map_or(Value::Null, Value::from),
                );
            }
            RowReport::populated(commit)
        }
        Err(e) => {
            log::warn!("Row {}: {}", row, e);
            RowReport::failed(&identifier, format!("Error in {}: {}", plan.target, e))
        }
    }
}

/// Everything needed to analyze a row on a single source
struct SinglePlan {
    source: StructureSource,
    preparation: Preparation,
    target: AnalysisTarget,
    options: AnalysisOptions,
}

fn plan_single(
    mode: &ModeConfig,
    c: &ColumnNames,
    table: &RecordTable,
    row: &str,
    identifier: &str,
) -> Result<SinglePlan, RecordError> {
    let text = |column: &str| cell::as_string(table.get(column, row));
    let required = |column: &str| {
        text(column).ok_or_else(|| RecordError::MissingInput(column.to_string()))
    };
    let position = |column: &str| {
        cell::as_position(table.get(column, row))
            .ok_or_else(|| RecordError::MissingInput(column.to_string()))
    };
    if identifier.is_empty() {
        return Err(RecordError::MissingInput(
            mode.default_index_column().to_string(),
        ));
    }

    let plan = match mode {
        ModeConfig::SingleSource {
            strip_ligands,
            renumber,
            ..
        } => {
            let chain = text(&c.pdb_chain);
            let source = experimental_or_predicted(c, table, row, identifier)?;
            let preparation = match source {
                StructureSource::Experimental { .. } => Preparation {
                    keep_chain: chain.clone(),
                    strip_solvent: true,
                    strip_ligands: *strip_ligands,
                    renumber_to_reference: *renumber,
                },
                _ => Preparation::none().with_renumbering(*renumber),
            };
            SinglePlan {
                source,
                preparation,
                target: AnalysisTarget::new(identifier, chain, position(&c.aa_position)?),
                options: AnalysisOptions::default(),
            }
        }
        ModeConfig::Specific {
            isolate_chain,
            strip,
            renumber,
            offset_fallback,
            ..
        } => {
            let chain = text(&c.pdb_chain);
            SinglePlan {
                source: StructureSource::experimental(required(&c.pdb_id)?),
                preparation: Preparation {
                    keep_chain: chain.clone().filter(|_| *isolate_chain),
                    strip_solvent: *strip,
                    strip_ligands: *strip,
                    renumber_to_reference: *renumber,
                },
                target: AnalysisTarget::new(identifier, chain, position(&c.aa_position)?),
                options: AnalysisOptions {
                    policy: if *offset_fallback {
                        ResolutionPolicy::with_offset_fallback()
                    } else {
                        ResolutionPolicy::exact()
                    },
                    geometry: true,
                    torsion: TorsionMode::Measure,
                },
            }
        }
        ModeConfig::Torsion { switch_source, .. } => {
            let source = experimental_or_predicted(c, table, row, identifier)?;
            SinglePlan {
                source,
                preparation: Preparation::none().with_renumbering(true),
                target: AnalysisTarget::new(
                    identifier,
                    text(&c.pdb_chain),
                    position(&c.analyzed_position)?,
                ),
                options: AnalysisOptions {
                    policy: ResolutionPolicy::exact(),
                    geometry: false,
                    torsion: if *switch_source {
                        TorsionMode::SwitchTo(StructureSource::predicted(identifier))
                    } else {
                        TorsionMode::Measure
                    },
                },
            }
        }
        ModeConfig::LocalPrediction { path_template, .. } => SinglePlan {
            source: StructureSource::local_file(path_template.replace(ID_PLACEHOLDER, identifier)),
            preparation: Preparation::none(),
            target: AnalysisTarget::new(
                identifier,
                text(&c.pdb_chain),
                position(&c.analyzed_aa_position)?,
            ),
            options: AnalysisOptions {
                policy: ResolutionPolicy::exact(),
                geometry: true,
                torsion: TorsionMode::Measure,
            },
        },
        ModeConfig::Candidates { .. } => {
            return Err(RecordError::InvalidInput {
                column: c.pdb_data_obj.clone(),
                message: "candidate rows need the candidate protocol".to_string(),
            })
        }
    };
    Ok(plan)
}

/// Source chosen by the `is_experimental` flag
fn experimental_or_predicted(
    c: &ColumnNames,
    table: &RecordTable,
    row: &str,
    identifier: &str,
) -> Result<StructureSource, RecordError> {
    let is_experimental = cell::as_bool(table.get(&c.is_experimental, row))
        .ok_or_else(|| RecordError::MissingInput(c.is_experimental.clone()))?;
    if is_experimental {
        let pdb = cell::as_string(table.get(&c.pdb_used, row))
            .ok_or_else(|| RecordError::MissingInput(c.pdb_used.clone()))?;
        Ok(StructureSource::experimental(pdb))
    } else {
        Ok(StructureSource::predicted(identifier))
    }
}

fn process_candidates(
    engine: &mut dyn GeometryEngine,
    c: &ColumnNames,
    table: &RecordTable,
    row: &str,
) -> RowReport {
    let accession = cell::as_string(table.get(&c.uniprot_id, row)).unwrap_or_default();
    let (position, candidates) = match candidate_inputs(c, table, row, &accession) {
        Ok(inputs) => inputs,
        Err(e) => return RowReport::failed(&accession, format!("Error in {}: {}", accession, e)),
    };

    let report = analyze_candidates(
        engine,
        &accession,
        position,
        candidates.as_deref(),
        &AnalysisOptions::default(),
    );

    let mut row_report = RowReport {
        errors: report
            .attempt_errors
            .into_iter()
            .map(|message| ErrorEntry::new(&accession, message))
            .collect(),
        all_failed: report.exhaustion.map(|m| ErrorEntry::new(&accession, m)),
        predicted_error: report.predicted_error.map(|m| ErrorEntry::new(&accession, m)),
        commit: None,
    };

    match report.result {
        Ok(success) => {
            let mut commit = RowCommit::default();
            commit_geometry(&mut commit, c, &success.analysis);
            match success.measured_on {
                MeasuredOn::Candidate(candidate) => {
                    log::info!("Row {}: {} measured on {}", row, accession, candidate.pdb_id);
                    commit.set(&c.is_experimental, true);
                    commit.set(&c.pdb_used, candidate.pdb_id);
                    commit.set(&c.pdb_chain, candidate.chain_id.map_or(Value::Null, Value::from));
                    commit.set(&c.pdb_resolution, cell::float_cell(candidate.resolution));
                    commit.set(
                        &c.pdb_experimental_method,
                        candidate.experimental_method.map_or(Value::Null, Value::from),
                    );
                }
                MeasuredOn::Predicted => {
                    log::info!("Row {}: {} measured on the predicted model", row, accession);
                    commit.set(&c.is_experimental, false);
                    commit.set(&c.pdb_used, Value::Null);
                    commit.set(&c.pdb_chain, Value::Null);
                    commit.set(&c.pdb_resolution, Value::Null);
                    commit.set(&c.pdb_experimental_method, Value::Null);
                }
            }
            row_report.commit = Some(commit);
        }
        Err(e) => log::warn!("Row {}: {}: {}", row, accession, e),
    }
    row_report
}

fn candidate_inputs(
    c: &ColumnNames,
    table: &RecordTable,
    row: &str,
    accession: &str,
) -> Result<(i64, Option<Vec<CandidateSource>>), RecordError> {
    if accession.is_empty() {
        return Err(RecordError::MissingInput(c.uniprot_id.clone()));
    }
    let position = cell::as_position(table.get(&c.aa_position, row))
        .ok_or_else(|| RecordError::MissingInput(c.aa_position.clone()))?;
    let candidates =
        candidate_list(table.get(&c.pdb_data_obj, row)).map_err(|message| {
            RecordError::InvalidInput {
                column: c.pdb_data_obj.clone(),
                message,
            }
        })?;
    Ok((position, candidates))
}

/// Parse the candidate list cell
///
/// Accepts an already parsed JSON array or a string holding one; blank
/// cells mean no list.
fn candidate_list(value: Option<&Value>) -> Result<Option<Vec<CandidateSource>>, String> {
    if cell::is_blank(value) {
        return Ok(None);
    }
    let parsed = match value {
        Some(Value::String(text)) => serde_json::from_str(text),
        Some(other) => serde_json::from_value(other.clone()),
        None => return Ok(None),
    };
    parsed.map(Some).map_err(|e| e.to_string())
}

fn commit_geometry(commit: &mut RowCommit, c: &ColumnNames, analysis: &ResidueAnalysis) {
    commit.set(&c.analyzed_position, analysis.position);
    commit.set(&c.analyzed_aa, analysis.kind.name());
    commit.set(&c.calculated_ses, cell::float_cell(analysis.ses));
    commit.set(&c.rel_sesa, cell::float_cell(analysis.rel_sesa));
    commit.set(&c.distance, cell::float_cell(analysis.distance));
    commit.set(&c.used_offset_fallback, analysis.used_offset_fallback);
}

fn commit_torsion(commit: &mut RowCommit, c: &ColumnNames, analysis: &ResidueAnalysis) {
    let torsion = analysis.torsion.unwrap_or_default();
    commit.set(&c.ramachandran_phi, cell::float_cell(torsion.phi));
    commit.set(&c.ramachandran_psi, cell::float_cell(torsion.psi));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_list_forms() {
        assert_eq!(candidate_list(None).unwrap(), None);
        assert_eq!(candidate_list(Some(&Value::Null)).unwrap(), None);

        let parsed = candidate_list(Some(&json!([{"pdb_id": "1a3n", "chain_id": "A"}])))
            .unwrap()
            .unwrap();
        assert_eq!(parsed[0].chain_id.as_deref(), Some("A"));

        let parsed = candidate_list(Some(&json!("[]"))).unwrap().unwrap();
        assert!(parsed.is_empty());

        assert!(candidate_list(Some(&json!("{not json"))).is_err());
    }

    #[test]
    fn test_output_columns_per_mode() {
        let torsion: ModeConfig = toml::from_str("kind = \"torsion\"").unwrap();
        assert_eq!(
            output_columns(&torsion),
            vec![
                "ramachandran_phi",
                "ramachandran_psi",
                "switched_source",
                "source_switch_position"
            ]
        );

        let candidates: ModeConfig = toml::from_str("kind = \"candidates\"").unwrap();
        let columns = output_columns(&candidates);
        assert!(columns.contains(&"relSESA"));
        assert!(columns.contains(&"pdb_experimental_method"));
        assert!(!columns.contains(&"ramachandran_phi"));
    }

    #[test]
    fn test_commit_applies_all_cells() {
        let mut commit = RowCommit::default();
        commit.set("distance", 2.5);
        commit.set("analyzed_aa", "ASN");
        let mut table = RecordTable::new();
        commit.apply(&mut table, "3");
        assert_eq!(table.get("distance", "3"), Some(&json!(2.5)));
        assert_eq!(table.get("analyzed_aa", "3"), Some(&json!("ASN")));
    }
}
