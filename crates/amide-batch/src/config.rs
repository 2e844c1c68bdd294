//! Run configuration
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! [input]
//! table = "chimera/preprocess.json"
//!
//! [output]
//! table = "chimera/output_all.json"
//! errors = "chimera/errors_all.csv"
//!
//! [host]
//! timeout_secs = 120
//!
//! [run]
//! start = 0
//! end = 2000
//!
//! [mode]
//! kind = "candidates"
//! ```

use std::path::{Path, PathBuf};

use amide_host::HostSettings;
use serde::Deserialize;

use crate::error::{BatchError, BatchResult};

/// Root configuration of a batch run
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub host: HostSettings,
    #[serde(default)]
    pub run: RowRange,
    pub mode: ModeConfig,
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> BatchResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BatchError::file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> BatchResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> BatchResult<()> {
        self.run.validate()?;
        if let ModeConfig::LocalPrediction { path_template, .. } = &self.mode {
            if !path_template.contains(ID_PLACEHOLDER) {
                return Err(BatchError::config(format!(
                    "path_template must contain {}",
                    ID_PLACEHOLDER
                )));
            }
        }
        Ok(())
    }

    /// Index column, falling back to the mode's default
    pub fn index_column(&self) -> &str {
        self.input
            .index_column
            .as_deref()
            .unwrap_or_else(|| self.mode.default_index_column())
    }
}

/// `[input]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Record table to process
    pub table: PathBuf,
    /// Column whose entries define the rows
    #[serde(default)]
    pub index_column: Option<String>,
}

/// `[output]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Annotated table; may equal the input table
    pub table: PathBuf,
    /// Per-record failures
    pub errors: PathBuf,
    /// Exhausted candidate lists (candidates mode)
    #[serde(default)]
    pub all_failed: Option<PathBuf>,
    /// Predicted-model failures (candidates mode)
    #[serde(default)]
    pub predicted_errors: Option<PathBuf>,
}

/// `[run]` section: half-open range `start..end` of row ordinals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RowRange {
    /// Every row
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows `start..end`
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    fn validate(&self) -> BatchResult<()> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(BatchError::config(format!(
                "row range start {} is after end {}",
                start, end
            ))),
            _ => Ok(()),
        }
    }

    /// Clamp to a table of `len` rows
    pub fn bounds(&self, len: usize) -> std::ops::Range<usize> {
        let end = self.end.map_or(len, |end| end.min(len));
        let start = self.start.unwrap_or(0).min(end);
        start..end
    }
}

/// Placeholder replaced by the record identifier in local model paths
pub const ID_PLACEHOLDER: &str = "{id}";

/// `[mode]` section, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeConfig {
    /// Candidate experimental structures, then the predicted model
    Candidates {
        #[serde(default)]
        columns: ColumnNames,
    },
    /// One experimental structure or the predicted model per row
    ///
    /// Experimental entries lose their solvent and the other chains;
    /// predicted models are analyzed as fetched.
    SingleSource {
        #[serde(default)]
        columns: ColumnNames,
        /// Also delete ligands from experimental entries
        #[serde(default)]
        strip_ligands: bool,
        /// Renumber residues to the reference sequence
        #[serde(default)]
        renumber: bool,
    },
    /// A named PDB entry and chain per row, positions taken as given
    Specific {
        #[serde(default)]
        columns: ColumnNames,
        #[serde(default = "enabled")]
        isolate_chain: bool,
        #[serde(default = "enabled")]
        strip: bool,
        #[serde(default)]
        renumber: bool,
        #[serde(default)]
        offset_fallback: bool,
    },
    /// Backbone torsion only, switching to the predicted model when undefined
    Torsion {
        #[serde(default)]
        columns: ColumnNames,
        #[serde(default = "enabled")]
        switch_source: bool,
    },
    /// Local model files located through a path template
    LocalPrediction {
        #[serde(default)]
        columns: ColumnNames,
        /// Model path with `{id}` standing for the record identifier
        path_template: String,
    },
}

fn enabled() -> bool {
    true
}

impl ModeConfig {
    /// Column names of this mode
    pub fn columns(&self) -> &ColumnNames {
        match self {
            ModeConfig::Candidates { columns }
            | ModeConfig::SingleSource { columns, .. }
            | ModeConfig::Specific { columns, .. }
            | ModeConfig::Torsion { columns, .. }
            | ModeConfig::LocalPrediction { columns, .. } => columns,
        }
    }

    /// Mode name as written in the configuration
    pub fn name(&self) -> &'static str {
        match self {
            ModeConfig::Candidates { .. } => "candidates",
            ModeConfig::SingleSource { .. } => "single_source",
            ModeConfig::Specific { .. } => "specific",
            ModeConfig::Torsion { .. } => "torsion",
            ModeConfig::LocalPrediction { .. } => "local_prediction",
        }
    }

    /// Column defining the rows when the input section names none
    pub fn default_index_column(&self) -> &str {
        let columns = self.columns();
        match self {
            ModeConfig::LocalPrediction { .. } => &columns.gene_name_and_position,
            _ => &columns.uniprot_id,
        }
    }

    /// Whether this mode writes the separate candidate logs
    pub fn uses_candidate_logs(&self) -> bool {
        matches!(self, ModeConfig::Candidates { .. })
    }
}

/// Table column names, overridable per mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    // Inputs
    pub uniprot_id: String,
    pub aa_position: String,
    pub pdb_data_obj: String,
    pub pdb_id: String,
    pub gene_name_and_position: String,
    pub analyzed_aa_position: String,

    // Inputs or outputs depending on the mode
    pub is_experimental: String,
    pub pdb_used: String,
    pub pdb_chain: String,
    pub analyzed_position: String,

    // Outputs
    pub analyzed_aa: String,
    #[serde(rename = "calculated_SES")]
    pub calculated_ses: String,
    #[serde(rename = "relSESA")]
    pub rel_sesa: String,
    pub distance: String,
    pub ramachandran_phi: String,
    pub ramachandran_psi: String,
    pub pdb_resolution: String,
    pub pdb_experimental_method: String,
    pub used_offset_fallback: String,
    pub switched_source: String,
    pub source_switch_position: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            uniprot_id: "uniprot_id".into(),
            aa_position: "aa_position".into(),
            pdb_data_obj: "pdb_data_obj".into(),
            pdb_id: "pdb_id".into(),
            gene_name_and_position: "gene_name_and_position".into(),
            analyzed_aa_position: "analyzed_aa_position".into(),
            is_experimental: "is_experimental".into(),
            pdb_used: "pdb_used".into(),
            pdb_chain: "pdb_chain".into(),
            analyzed_position: "analyzed_position".into(),
            analyzed_aa: "analyzed_aa".into(),
            calculated_ses: "calculated_SES".into(),
            rel_sesa: "relSESA".into(),
            distance: "distance".into(),
            ramachandran_phi: "ramachandran_phi".into(),
            ramachandran_psi: "ramachandran_psi".into(),
            pdb_resolution: "pdb_resolution".into(),
            pdb_experimental_method: "pdb_experimental_method".into(),
            used_offset_fallback: "used_offset_fallback".into(),
            switched_source: "switched_source".into(),
            source_switch_position: "source_switch_position".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [input]
        table = "in.json"

        [output]
        table = "out.json"
        errors = "errors.csv"

        [mode]
        kind = "candidates"
    "#;

    #[test]
    fn test_minimal_config() {
        let config = RunConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.mode.name(), "candidates");
        assert_eq!(config.index_column(), "uniprot_id");
        assert_eq!(config.host.timeout_secs, 120);
        assert_eq!(config.run, RowRange::all());
    }

    #[test]
    fn test_mode_options_and_columns() {
        let config = RunConfig::from_toml_str(
            r#"
            [input]
            table = "in.json"
            [output]
            table = "in.json"
            errors = "errors.csv"
            [run]
            start = 10
            end = 20
            [mode]
            kind = "specific"
            renumber = true
            [mode.columns]
            pdb_chain = "chain"
            "#,
        )
        .unwrap();
        match &config.mode {
            ModeConfig::Specific {
                isolate_chain,
                strip,
                renumber,
                offset_fallback,
                columns,
            } => {
                assert!(*isolate_chain && *strip && *renumber && !*offset_fallback);
                assert_eq!(columns.pdb_chain, "chain");
                assert_eq!(columns.pdb_id, "pdb_id");
            }
            other => panic!("unexpected mode {:?}", other),
        }
        assert_eq!(config.run.bounds(100), 10..20);
    }

    #[test]
    fn test_single_source_cleanup_defaults() {
        let config = RunConfig::from_toml_str(&MINIMAL.replace("candidates", "single_source"))
            .unwrap();
        assert_eq!(
            config.mode,
            ModeConfig::SingleSource {
                columns: ColumnNames::default(),
                strip_ligands: false,
                renumber: false,
            }
        );

        let mode: ModeConfig =
            toml::from_str("kind = \"single_source\"\nrenumber = true").unwrap();
        assert!(matches!(
            mode,
            ModeConfig::SingleSource {
                renumber: true,
                strip_ligands: false,
                ..
            }
        ));
    }

    #[test]
    fn test_local_prediction_needs_placeholder() {
        let err = RunConfig::from_toml_str(
            r#"
            [input]
            table = "in.json"
            [output]
            table = "out.json"
            errors = "errors.csv"
            [mode]
            kind = "local_prediction"
            path_template = "/models/model.pdb"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn test_row_range_bounds() {
        assert_eq!(RowRange::all().bounds(5), 0..5);
        assert_eq!(RowRange::new(Some(3), Some(50)).bounds(5), 3..5);
        assert_eq!(RowRange::new(Some(9), None).bounds(5), 5..5);
        let err = RowRange::new(Some(4), Some(2)).validate().unwrap_err();
        assert!(err.to_string().contains("after end"));
    }
}
