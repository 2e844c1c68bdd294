//! Per-residue confidence (pLDDT) from AlphaFold model files
//!
//! AlphaFold mmCIF files carry per-residue pLDDT scores in the
//! `_ma_qa_metric_local` loop. Given a list of `(accession, position)`
//! rows, this module looks up the score of each residue of interest and
//! flags it as high confidence when it reaches [`HIGH_CONFIDENCE_THRESHOLD`].

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};

use crate::cell;
use crate::cif::find_loop;
use crate::error::{IoError, IoResult};

/// Score at or above which a residue counts as confidently predicted
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 70.0;

/// mmCIF category holding local quality metrics
const METRIC_CATEGORY: &str = "_ma_qa_metric_local";

/// Confidence score of one residue in a model
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueConfidence {
    /// Chain (label asym id)
    pub chain: String,
    /// Three-letter residue name
    pub residue_name: String,
    /// Sequence position
    pub position: i64,
    /// pLDDT score (0-100)
    pub score: f64,
}

/// Output row of a pLDDT lookup
#[derive(Debug, Clone, PartialEq)]
pub struct PlddtRow {
    /// UniProt accession
    pub uniprot_id: String,
    /// Residue position that was looked up
    pub aa_position: i64,
    /// Score at that position
    pub plddt_score: f64,
}

impl PlddtRow {
    /// Whether the score reaches the high-confidence threshold
    pub fn is_high_confidence(&self) -> bool {
        self.plddt_score >= HIGH_CONFIDENCE_THRESHOLD
    }
}

/// File name of the AlphaFold DB model for an accession
pub fn alphafold_model_file_name(accession: &str) -> String {
    format!("AF-{}-F1-model_v4.cif", accession)
}

/// Parse per-residue scores from mmCIF text
pub fn parse_confidences(content: &str) -> IoResult<Vec<ResidueConfidence>> {
    let table = find_loop(content, METRIC_CATEGORY)
        .ok_or_else(|| IoError::parse(0, format!("no {} loop found", METRIC_CATEGORY)))?;

    let index = |item: &str| {
        table
            .item_index(item)
            .ok_or_else(|| IoError::parse(0, format!("{} lacks item {}", METRIC_CATEGORY, item)))
    };
    let chain_idx = index("label_asym_id")?;
    let name_idx = index("label_comp_id")?;
    let seq_idx = index("label_seq_id")?;
    let value_idx = index("metric_value")?;

    let mut residues = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let position = row[seq_idx].parse::<i64>().map_err(|_| {
            IoError::parse(i + 1, format!("invalid sequence id '{}'", row[seq_idx]))
        })?;
        let score = row[value_idx].parse::<f64>().map_err(|_| {
            IoError::parse(i + 1, format!("invalid metric value '{}'", row[value_idx]))
        })?;

        residues.push(ResidueConfidence {
            chain: row[chain_idx].clone(),
            residue_name: row[name_idx].clone(),
            position,
            score,
        });
    }

    Ok(residues)
}

/// Read per-residue scores from an mmCIF file
pub fn read_confidences(path: &Path) -> IoResult<Vec<ResidueConfidence>> {
    parse_confidences(&std::fs::read_to_string(path)?)
}

/// First residue in the model at a given position, in any chain
pub fn confidence_at(residues: &[ResidueConfidence], position: i64) -> Option<&ResidueConfidence> {
    residues.iter().find(|r| r.position == position)
}

/// Look up the pLDDT score of every `(uniprot_id, aa_position)` row
///
/// Models are looked up in `model_dir` by their AlphaFold DB file name.
/// Rows whose model file is missing, or whose position is not in the
/// model, are skipped with a warning.
pub fn collect_plddt(rows_csv: &Path, model_dir: &Path) -> IoResult<Vec<PlddtRow>> {
    let mut reader = ReaderBuilder::new().from_reader(File::open(rows_csv)?);
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| IoError::missing_column(name))
    };
    let id_idx = column("uniprot_id")?;
    let pos_idx = column("aa_position")?;

    let mut results = Vec::new();
    for record in reader.records() {
        let record = record?;
        let uniprot_id = record.get(id_idx).unwrap_or("").trim().to_string();
        let raw_position = serde_json::Value::String(record.get(pos_idx).unwrap_or("").to_string());
        let Some(aa_position) = cell::as_position(Some(&raw_position)) else {
            log::warn!("Skipping {}: invalid position {:?}", uniprot_id, raw_position);
            continue;
        };

        let model_path: PathBuf = model_dir.join(alphafold_model_file_name(&uniprot_id));
        if !model_path.is_file() {
            log::warn!("CIF file not found for {}", uniprot_id);
            continue;
        }

        let residues = read_confidences(&model_path)?;
        match confidence_at(&residues, aa_position) {
            Some(residue) => results.push(PlddtRow {
                uniprot_id,
                aa_position,
                plddt_score: residue.score,
            }),
            None => log::warn!("Position {} not found in model of {}", aa_position, uniprot_id),
        }
    }

    Ok(results)
}

/// Write lookup results as CSV with a header row
pub fn write_plddt_csv(rows: &[PlddtRow], path: &Path) -> IoResult<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(["uniprot_id", "aa_position", "plddt_score", "high_confidence"])?;
    for row in rows {
        writer.write_record([
            row.uniprot_id.clone(),
            row.aa_position.to_string(),
            row.plddt_score.to_string(),
            if row.is_high_confidence() { "Yes" } else { "No" }.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
