//! Batch driver
//!
//! Walks the rows of a record table in index order, analyzes each one and
//! commits the results in place. A failing row is logged and skipped; it
//! never stops the batch.

use amide_host::GeometryEngine;
use amide_io::{ErrorLog, RecordTable};
use serde_json::Value;

use crate::config::{ModeConfig, RowRange};
use crate::error::BatchResult;
use crate::modes::{output_columns, process_row};

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Every output column was written
    Populated,
    /// Output columns left at their placeholder, failure logged
    Failed,
}

/// Summary of a batch run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-record failures
    pub errors: ErrorLog,
    /// Exhausted candidate lists
    pub all_failed: ErrorLog,
    /// Predicted-model failures
    pub predicted_errors: ErrorLog,
    /// Outcome of each processed row, in processing order
    pub outcomes: Vec<(String, RowOutcome)>,
}

impl RunReport {
    /// Number of rows processed
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of rows populated
    pub fn populated(&self) -> usize {
        self.count(RowOutcome::Populated)
    }

    /// Number of rows that failed
    pub fn failed(&self) -> usize {
        self.count(RowOutcome::Failed)
    }

    fn count(&self, outcome: RowOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Process the rows of `table` selected by `range`
///
/// Fails only when the index column is missing.
pub fn run_batch(
    engine: &mut dyn GeometryEngine,
    table: &mut RecordTable,
    mode: &ModeConfig,
    index_column: &str,
    range: RowRange,
) -> BatchResult<RunReport> {
    let rows = table.row_keys(index_column)?;
    let bounds = range.bounds(rows.len());
    let rows = &rows[bounds.clone()];
    log::info!(
        "Running {} mode over rows {}..{} of {}",
        mode.name(),
        bounds.start,
        bounds.end,
        table.row_count(index_column)?
    );

    let placeholders: Vec<String> = output_columns(mode)
        .into_iter()
        .map(str::to_string)
        .collect();
    for row in rows {
        for column in &placeholders {
            if table.get(column, row).is_none() {
                table.set(column, row, Value::Null);
            }
        }
    }

    let mut report = RunReport::default();
    for (n, row) in rows.iter().enumerate() {
        log::info!("Row {} ({}/{})", row, n + 1, rows.len());
        let row_report = process_row(engine, mode, table, row);

        for entry in row_report.errors {
            report.errors.push(entry.identifier, entry.message);
        }
        if let Some(entry) = row_report.all_failed {
            report.all_failed.push(entry.identifier, entry.message);
        }
        if let Some(entry) = row_report.predicted_error {
            report.predicted_errors.push(entry.identifier, entry.message);
        }

        let outcome = match row_report.commit {
            Some(commit) => {
                commit.apply(table, row);
                RowOutcome::Populated
            }
            None => RowOutcome::Failed,
        };
        report.outcomes.push((row.clone(), outcome));
    }

    log::info!(
        "Processed {} rows: {} populated, {} failed",
        report.processed(),
        report.populated(),
        report.failed()
    );
    Ok(report)
}
