//! File-level batch runs
//!
//! Reads the input table, makes sure every output file can be created,
//! runs the batch and writes the annotated table and the error logs.

use std::fs::File;
use std::path::Path;

use amide_host::GeometryEngine;
use amide_io::RecordTable;

use crate::config::RunConfig;
use crate::driver::{run_batch, RunReport};
use crate::error::{BatchError, BatchResult};

/// Run a configured batch against an engine
///
/// The input is read in full and all output files are created before the
/// first row is processed, so an unreadable input or an unwritable output
/// aborts the run without touching the engine.
pub fn run_files(engine: &mut dyn GeometryEngine, config: &RunConfig) -> BatchResult<RunReport> {
    let mut table = RecordTable::read(&config.input.table)?;
    log::info!("Read {:?}", config.input.table);

    let outputs = output_paths(config);
    for path in &outputs {
        create(path)?;
    }

    let report = run_batch(
        engine,
        &mut table,
        &config.mode,
        config.index_column(),
        config.run,
    )?;

    table.write(&config.output.table)?;
    log::info!("Wrote {:?}", config.output.table);
    report.errors.write_csv(&config.output.errors)?;
    if config.mode.uses_candidate_logs() {
        if let Some(path) = &config.output.all_failed {
            report.all_failed.write_csv(path)?;
        }
        if let Some(path) = &config.output.predicted_errors {
            report.predicted_errors.write_csv(path)?;
        }
    }
    Ok(report)
}

fn output_paths(config: &RunConfig) -> Vec<&Path> {
    let mut paths = vec![config.output.table.as_path(), config.output.errors.as_path()];
    if config.mode.uses_candidate_logs() {
        paths.extend(config.output.all_failed.as_deref());
        paths.extend(config.output.predicted_errors.as_deref());
    }
    paths
}

fn create(path: &Path) -> BatchResult<()> {
    File::create(path)
        .map(drop)
        .map_err(|e| BatchError::file(path, e))
}
