//! Two-column CSV error logs
//!
//! Each batch run collects `(identifier, message)` pairs in the order the
//! failures happened and writes them as a headerless CSV next to the output
//! table.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{Terminator, WriterBuilder};

use crate::error::IoResult;

/// One logged failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// Identifier of the record (usually the UniProt accession)
    pub identifier: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorEntry {
    /// Create a new entry
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// Ordered, append-only list of failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, identifier: impl Into<String>, message: impl Into<String>) {
        self.entries.push(ErrorEntry::new(identifier, message));
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the log as headerless CSV
    pub fn write_csv_to<W: Write>(&self, writer: W) -> IoResult<()> {
        let mut csv = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::CRLF)
            .from_writer(writer);

        for entry in &self.entries {
            csv.write_record([entry.identifier.as_str(), entry.message.as_str()])?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the log to a file, replacing any previous content
    pub fn write_csv(&self, path: &Path) -> IoResult<()> {
        self.write_csv_to(File::create(path)?)?;
        log::info!("Wrote {} error entries to {:?}", self.entries.len(), path);
        Ok(())
    }
}
