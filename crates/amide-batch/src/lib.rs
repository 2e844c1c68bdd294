//! Batch driver for amide residue analysis
//!
//! Connects a [`RunConfig`] (input table, output files, mode) to the
//! residue analysis in `amide-analysis`:
//!
//! - [`run_files`] - read, process and write a whole run
//! - [`run_batch`] - process an in-memory table
//! - [`process_row`] - analyze a single row according to its mode
//!
//! # Modes
//!
//! | kind | source | positions |
//! |---|---|---|
//! | `candidates` | candidate PDB entries, then the predicted model | offset fallback |
//! | `single_source` | `pdb_used` or the predicted model | offset fallback |
//! | `specific` | `pdb_id` | exact unless configured |
//! | `torsion` | `pdb_used` or the predicted model, switching on missing torsion | exact |
//! | `local_prediction` | model file from a path template | exact |

pub mod config;
pub mod driver;
pub mod error;
pub mod modes;
pub mod runner;

// Re-exports
pub use config::{ColumnNames, InputConfig, ModeConfig, OutputConfig, RowRange, RunConfig};
pub use driver::{run_batch, RowOutcome, RunReport};
pub use error::{BatchError, BatchResult, RecordError};
pub use modes::{output_columns, process_row, RowCommit, RowReport};
pub use runner::run_files;
