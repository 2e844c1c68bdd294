//! mmCIF loop extraction
//!
//! Just enough mmCIF to pull a single `loop_` category out of a model file
//! as rows of named values.

pub mod lexer;

pub use lexer::{tokenize, Token};

/// A `loop_` category materialized as rows of string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CifLoop {
    /// Item names without the category prefix (e.g. `label_seq_id`)
    pub items: Vec<String>,
    /// Rows in file order; each row has one value per item
    pub rows: Vec<Vec<String>>,
}

impl CifLoop {
    /// Column index of an item
    pub fn item_index(&self, item: &str) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }

    /// Iterate over the values of one item
    pub fn column<'a>(&'a self, item: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.item_index(item)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }
}

/// Extract the `loop_` whose items belong to `category` (e.g.
/// `_ma_qa_metric_local`)
///
/// Returns `None` when the category does not appear as a loop. A trailing
/// partial row is dropped.
pub fn find_loop(input: &str, category: &str) -> Option<CifLoop> {
    let prefix = format!("{}.", category);
    let tokens = tokenize(input);
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i] != Token::Loop {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        let mut items = Vec::new();
        while let Some(Token::Name(name)) = tokens.get(j) {
            items.push(*name);
            j += 1;
        }

        if items.is_empty() || !items.iter().all(|n| n.starts_with(&prefix)) {
            i = j.max(i + 1);
            continue;
        }

        let width = items.len();
        let mut rows = Vec::new();
        let mut row = Vec::with_capacity(width);
        while let Some(value) = tokens.get(j).and_then(|t| t.as_value()) {
            row.push(value.to_string());
            if row.len() == width {
                rows.push(std::mem::replace(&mut row, Vec::with_capacity(width)));
            }
            j += 1;
        }

        return Some(CifLoop {
            items: items
                .into_iter()
                .map(|n| n[prefix.len()..].to_string())
                .collect(),
            rows,
        });
    }

    None
}
