//! Batch submitted for validation or upsert

use serde::{Deserialize, Serialize};

/// Rows destined for one target table, aligned by position to `columns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetBatch {
    /// Target table (the sheet name)
    pub sheet_name: String,
    /// Declared header, in input order
    pub columns: Vec<String>,
    /// Raw cells, one vector per row
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Natural key used for upsert matching (defaults to the first column)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_column_index: Option<usize>,
}

impl SheetBatch {
    /// Create a new batch
    pub fn new(
        sheet_name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
    ) -> Self {
        SheetBatch {
            sheet_name: sheet_name.into(),
            columns,
            rows,
            key_column_index: None,
        }
    }

    /// Set the key column index
    pub fn with_key_column(mut self, index: usize) -> Self {
        self.key_column_index = Some(index);
        self
    }

    /// Key column index, defaulting to 0
    pub fn key_index(&self) -> usize {
        self.key_column_index.unwrap_or(0)
    }

    /// Raw cell at (row, col); cells missing from short rows read as null
    pub fn cell(&self, row: usize, col: usize) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL)
    }

    /// Number of declared columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}
