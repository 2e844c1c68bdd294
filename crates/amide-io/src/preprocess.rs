//! Spreadsheet to record-table conversion
//!
//! Sheets are exported to CSV and converted into the column-major JSON
//! layout the batch driver consumes. Types are inferred per column: blanks
//! become `null`, a column whose every other cell is an integer, a number
//! or a boolean becomes JSON scalars, and anything else stays text. In a
//! text column, cells holding a JSON array or object (such as a list of
//! candidate structures) are embedded as structured values. Identifier
//! columns are always text, so a PDB code like `1e10` is never read as a
//! number.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde_json::{Map, Number, Value};

use crate::error::IoResult;
use crate::table::RecordTable;

/// Prefix given to columns without a header
const UNNAMED_PREFIX: &str = "Unnamed: ";

/// Columns kept as text by default
pub const DEFAULT_TEXT_COLUMNS: [&str; 5] = [
    "uniprot_id",
    "gene_name_and_position",
    "pdb_id",
    "pdb_used",
    "pdb_chain",
];

/// Options for spreadsheet conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Drop columns whose header is empty (`Unnamed: N`)
    pub drop_unnamed: bool,
    /// Field delimiter
    pub delimiter: u8,
    /// Columns never converted to numbers or booleans
    pub text_columns: Vec<String>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            drop_unnamed: false,
            delimiter: b',',
            text_columns: DEFAULT_TEXT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Type shared by the non-blank cells of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Blank,
    Bool,
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    fn of(raw: &str) -> Self {
        let text = raw.trim();
        if is_blank_text(text) {
            ColumnKind::Blank
        } else if parse_bool(text).is_some() {
            ColumnKind::Bool
        } else if text.parse::<i64>().is_ok() {
            ColumnKind::Integer
        } else if text.parse::<f64>().map_or(false, f64::is_finite) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    fn merge(self, other: Self) -> Self {
        use ColumnKind::*;
        match (self, other) {
            (Blank, kind) | (kind, Blank) => kind,
            (Integer, Float) | (Float, Integer) => Float,
            (a, b) if a == b => a,
            _ => Text,
        }
    }
}

/// Convert CSV text into a record table
pub fn table_from_csv_reader<R: Read>(
    reader: R,
    options: &PreprocessOptions,
) -> IoResult<RecordTable> {
    let mut csv = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = column_names(csv.headers()?.iter());
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in csv.records() {
        let record = record?;
        for (col, cells) in columns.iter_mut().enumerate() {
            cells.push(record.get(col).unwrap_or("").to_string());
        }
    }

    let mut table = RecordTable::new();
    for (name, raw) in headers.into_iter().zip(columns) {
        if options.drop_unnamed && name.starts_with(UNNAMED_PREFIX) {
            log::debug!("Dropping unnamed column '{}'", name);
            continue;
        }
        let kind = if options.text_columns.contains(&name) {
            ColumnKind::Text
        } else {
            raw.iter()
                .map(|cell| ColumnKind::of(cell))
                .fold(ColumnKind::Blank, ColumnKind::merge)
        };
        let cells: Map<String, Value> = raw
            .iter()
            .enumerate()
            .map(|(row, cell)| (row.to_string(), convert_cell(cell, kind)))
            .collect();
        table.insert_column(name, cells);
    }

    Ok(table)
}

/// Convert a CSV file into a record table
pub fn table_from_csv(path: &Path, options: &PreprocessOptions) -> IoResult<RecordTable> {
    let table = table_from_csv_reader(File::open(path)?, options)?;
    log::info!(
        "Converted {:?} into a table with {} columns",
        path,
        table.column_count()
    );
    Ok(table)
}

/// Name header cells, filling blanks and de-duplicating repeats
fn column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for (i, header) in headers.enumerate() {
        let header = header.trim();
        let base = if header.is_empty() {
            format!("{}{}", UNNAMED_PREFIX, i)
        } else {
            header.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }

    names
}

fn is_blank_text(text: &str) -> bool {
    text.is_empty() || text.eq_ignore_ascii_case("nan")
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// JSON value of a raw cell in a column of the given kind
fn convert_cell(raw: &str, kind: ColumnKind) -> Value {
    let text = raw.trim();
    if is_blank_text(text) {
        return Value::Null;
    }

    let converted = match kind {
        ColumnKind::Bool => parse_bool(text).map(Value::Bool),
        ColumnKind::Integer => text.parse::<i64>().ok().map(Value::from),
        ColumnKind::Float => text
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)),
        ColumnKind::Text if text.starts_with('[') || text.starts_with('{') => {
            serde_json::from_str::<Value>(text).ok()
        }
        ColumnKind::Text | ColumnKind::Blank => None,
    };
    converted.unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_kinds() {
        let kind = |cells: &[&str]| {
            cells
                .iter()
                .map(|c| ColumnKind::of(c))
                .fold(ColumnKind::Blank, ColumnKind::merge)
        };
        assert_eq!(kind(&["58", "", "7"]), ColumnKind::Integer);
        assert_eq!(kind(&["58", "2.5"]), ColumnKind::Float);
        assert_eq!(kind(&["True", "false"]), ColumnKind::Bool);
        assert_eq!(kind(&["1abc", "1e10"]), ColumnKind::Text);
        assert_eq!(kind(&["1", "True"]), ColumnKind::Text);
        assert_eq!(kind(&["", "nan"]), ColumnKind::Blank);
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell("", ColumnKind::Integer), Value::Null);
        assert_eq!(convert_cell("58", ColumnKind::Integer), json!(58));
        assert_eq!(convert_cell("58", ColumnKind::Float), json!(58));
        assert_eq!(convert_cell("2.5", ColumnKind::Float), json!(2.5));
        assert_eq!(convert_cell("True", ColumnKind::Bool), json!(true));
        assert_eq!(convert_cell("58", ColumnKind::Text), json!("58"));
        assert_eq!(
            convert_cell(r#"[{"pdb_id": "1abc", "chain_id": "A"}]"#, ColumnKind::Text),
            json!([{"pdb_id": "1abc", "chain_id": "A"}])
        );
        assert_eq!(convert_cell("[not json", ColumnKind::Text), json!("[not json"));
    }

    #[test]
    fn test_codes_that_look_numeric_stay_text() {
        let csv = "pdb_id,score,code\n1e10,1,1abc\n2E50,2e3,1e10\n";
        let table = table_from_csv_reader(csv.as_bytes(), &PreprocessOptions::default()).unwrap();
        assert_eq!(table.get("pdb_id", "0"), Some(&json!("1e10")));
        assert_eq!(table.get("pdb_id", "1"), Some(&json!("2E50")));
        assert_eq!(table.get("score", "1"), Some(&json!(2000.0)));
        assert_eq!(table.get("code", "1"), Some(&json!("1e10")));
    }

    #[test]
    fn test_column_names_fill_and_dedupe() {
        let names = column_names(["a", "", "a", "b"].into_iter());
        assert_eq!(names, vec!["a", "Unnamed: 1", "a.1", "b"]);
    }

    #[test]
    fn test_csv_to_table() {
        let csv = "uniprot_id,aa_position,,relSESA\nP68871,58,x,\nP69905,,y,\n";
        let options = PreprocessOptions {
            drop_unnamed: true,
            ..Default::default()
        };
        let table = table_from_csv_reader(csv.as_bytes(), &options).unwrap();

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["uniprot_id", "aa_position", "relSESA"]);
        assert_eq!(table.get("aa_position", "0"), Some(&json!(58)));
        assert_eq!(table.get("aa_position", "1"), Some(&Value::Null));
        assert_eq!(table.get("relSESA", "1"), Some(&Value::Null));
        assert_eq!(table.row_count("uniprot_id").unwrap(), 2);
    }
}
