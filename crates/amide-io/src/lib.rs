//! Table and file I/O for amide batch analysis
//!
//! This crate handles every file the batch tooling reads or writes:
//!
//! - **Record tables** - column-major JSON tables (`{column: {row: value}}`)
//!   exchanged with spreadsheet tooling, see [`RecordTable`]
//! - **Error logs** - headerless `(identifier, message)` CSV files
//! - **Preprocessing** - CSV exports of spreadsheets converted to record tables
//! - **pLDDT extraction** - per-residue confidence from AlphaFold mmCIF files
//!
//! # Quick Start
//!
//! ```no_run
//! use amide_io::{RecordTable, cell};
//! use std::path::Path;
//!
//! let mut table = RecordTable::read(Path::new("preprocess.json")).unwrap();
//! for row in table.row_keys("uniprot_id").unwrap() {
//!     let position = cell::as_position(table.get("aa_position", &row));
//!     println!("{row}: {position:?}");
//! }
//! table.set("relSESA", "0", 0.42);
//! table.write(Path::new("output.json")).unwrap();
//! ```

pub mod cell;
pub mod cif;
pub mod errlog;
pub mod error;
pub mod plddt;
pub mod preprocess;
pub mod table;

// Re-exports
pub use errlog::{ErrorEntry, ErrorLog};
pub use error::{IoError, IoResult};
pub use preprocess::{table_from_csv, table_from_csv_reader, PreprocessOptions};
pub use table::RecordTable;
