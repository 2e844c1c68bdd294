//! Row-indexed record table
//!
//! The batch tables exchanged with spreadsheet tooling are JSON objects of
//! the form `{column: {"<row index>": value}}`, the layout produced by a
//! column-oriented dataframe dump. [`RecordTable`] keeps that layout intact
//! (including column and row order) so a table can be read, annotated in
//! place and written back without disturbing columns it does not know about.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{IoError, IoResult};

/// Indentation used when writing tables, matching the files the
/// spreadsheet side already produces.
const TABLE_INDENT: &[u8] = b"    ";

/// A column-major table of JSON cells keyed by string row indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    columns: Map<String, Value>,
}

impl RecordTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from an already-parsed JSON value
    ///
    /// The value must be an object whose members are all objects.
    pub fn from_value(value: Value) -> IoResult<Self> {
        let Value::Object(columns) = value else {
            return Err(IoError::malformed("top-level value is not an object"));
        };

        for (name, column) in &columns {
            if !column.is_object() {
                return Err(IoError::malformed(format!(
                    "column '{}' is not an object of row cells",
                    name
                )));
            }
        }

        Ok(Self { columns })
    }

    /// Parse a table from a JSON string
    pub fn from_json_str(content: &str) -> IoResult<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    /// Read a table from a JSON file
    pub fn read(path: &Path) -> IoResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let value: Value = serde_json::from_reader(reader)?;
        let table = Self::from_value(value)?;
        log::debug!(
            "Read table {:?} with {} columns",
            path,
            table.columns.len()
        );
        Ok(table)
    }

    /// Serialize the table to a pretty-printed JSON string
    pub fn to_json_string(&self) -> IoResult<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| IoError::malformed(e.to_string()))
    }

    /// Write the table as pretty-printed JSON
    pub fn write_to<W: Write>(&self, writer: W) -> IoResult<()> {
        let formatter = PrettyFormatter::with_indent(TABLE_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.columns.serialize(&mut serializer)?;
        Ok(())
    }

    /// Write the table to a file, replacing any previous content
    pub fn write(&self, path: &Path) -> IoResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Check whether a column exists
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Iterate over column names in table order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row keys of a column, in table order
    ///
    /// The index column defines which rows a batch visits.
    pub fn row_keys(&self, index_column: &str) -> IoResult<Vec<String>> {
        let column = self
            .column(index_column)
            .ok_or_else(|| IoError::missing_column(index_column))?;
        Ok(column.keys().cloned().collect())
    }

    /// Number of rows according to the index column
    pub fn row_count(&self, index_column: &str) -> IoResult<usize> {
        self.column(index_column)
            .map(|c| c.len())
            .ok_or_else(|| IoError::missing_column(index_column))
    }

    /// Get a cell
    ///
    /// Returns `None` when either the column or the row is absent.
    pub fn get(&self, column: &str, row: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.get(row))
    }

    /// Set a cell, creating the column if needed
    pub fn set(&mut self, column: &str, row: &str, value: impl Into<Value>) {
        let entry = self
            .columns
            .entry(column.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(cells) = entry {
            cells.insert(row.to_string(), value.into());
        }
    }

    /// Insert a whole column, replacing an existing one with the same name
    pub fn insert_column(&mut self, column: impl Into<String>, cells: Map<String, Value>) {
        self.columns.insert(column.into(), Value::Object(cells));
    }

    fn column(&self, name: &str) -> Option<&Map<String, Value>> {
        self.columns.get(name).and_then(|c| c.as_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RecordTable {
        RecordTable::from_value(json!({
            "uniprot_id": {"0": "P68871", "1": "P69905"},
            "aa_position": {"0": 58, "1": 78.0},
            "relSESA": {"0": null, "1": null}
        }))
        .unwrap()
    }

    #[test]
    fn test_row_keys_follow_index_column() {
        let table = sample();
        assert_eq!(table.row_keys("uniprot_id").unwrap(), vec!["0", "1"]);
        assert_eq!(table.row_count("uniprot_id").unwrap(), 2);
        assert!(matches!(
            table.row_keys("missing"),
            Err(IoError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_set_creates_column() {
        let mut table = sample();
        table.set("distance", "1", 3.2);
        assert_eq!(table.get("distance", "1"), Some(&json!(3.2)));
        assert_eq!(table.get("distance", "0"), None);
    }

    #[test]
    fn test_rejects_non_object_columns() {
        let err = RecordTable::from_json_str(r#"{"a": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, IoError::MalformedTable(_)));
    }

    #[test]
    fn test_column_order_is_preserved() {
        let table = RecordTable::from_json_str(r#"{"z": {}, "a": {}, "m": {}}"#).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_pretty_output_uses_four_spaces() {
        let mut table = RecordTable::new();
        table.set("analyzed_aa", "0", "ASN");
        let text = table.to_json_string().unwrap();
        assert_eq!(text, "{\n    \"analyzed_aa\": {\n        \"0\": \"ASN\"\n    }\n}");
    }
}
