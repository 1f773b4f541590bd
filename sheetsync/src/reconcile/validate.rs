//! Cell validation against the live schema
//!
//! Validation never fails: every problem is reported as a per-cell outcome in
//! a grid shaped exactly like the submitted rows.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::coerce::coerce;
use super::types::{CanonicalCell, CellOutcome, SheetBatch, ValidationGrid, VerificationReport};
use crate::schema::{ColumnSchema, SqlTypeCategory, TableSchema};

/// Plain decimal literal: optional sign, optional thousands grouping,
/// optional fraction. No exponent, no NaN/inf.
static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d*)?|\.\d+)$")
        .expect("decimal pattern is valid")
});

/// Rows sampled per column by the sheet verification report
const VERIFY_SAMPLE_ROWS: usize = 10;

/// Validate one cell: type first, then length
pub fn validate_cell(cell: &CanonicalCell, column: &ColumnSchema) -> CellOutcome {
    if let Some(message) = check_type(cell, column) {
        return CellOutcome::type_mismatch(message);
    }

    if let (Some(max_length), false) = (column.max_length, cell.is_null()) {
        let length = cell.printed().chars().count();
        if length > max_length as usize {
            return CellOutcome::length_exceeded(max_length);
        }
    }

    CellOutcome::valid()
}

/// Type compatibility of a cell with a column; `Some(message)` on mismatch
pub fn check_type(cell: &CanonicalCell, column: &ColumnSchema) -> Option<String> {
    if cell.is_null() {
        return (!column.nullable).then(|| "Value required".to_string());
    }

    let ok = match &column.category {
        SqlTypeCategory::Integer => match cell {
            CanonicalCell::Int(_) => true,
            CanonicalCell::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },
        SqlTypeCategory::Boolean => match cell {
            CanonicalCell::Bool(_) => true,
            other => matches!(other.printed().as_str(), "0" | "1"),
        },
        SqlTypeCategory::Decimal => is_decimal_literal(&cell.printed()),
        // Date/time and GUID values are only sampled by `verify_against`
        SqlTypeCategory::Text
        | SqlTypeCategory::Temporal
        | SqlTypeCategory::Guid
        | SqlTypeCategory::Unknown(_) => true,
    };

    if ok {
        return None;
    }

    Some(mismatch_message(column, cell))
}

fn mismatch_message(column: &ColumnSchema, cell: &CanonicalCell) -> String {
    format!("Expected {} but got '{}'", column.category.label(), cell.printed())
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

fn is_temporal_literal(text: &str) -> bool {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(text, f).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(text, f).is_ok())
}

/// Type check used when sampling a sheet: adds date/time and GUID parsing on
/// top of `check_type`
fn check_sample_type(cell: &CanonicalCell, column: &ColumnSchema) -> Option<String> {
    if let Some(message) = check_type(cell, column) {
        return Some(message);
    }

    let ok = match (&column.category, cell) {
        (SqlTypeCategory::Temporal, CanonicalCell::String(s)) => is_temporal_literal(s),
        (SqlTypeCategory::Temporal, _) => false,
        (SqlTypeCategory::Guid, CanonicalCell::String(s)) => Uuid::parse_str(s.trim()).is_ok(),
        (SqlTypeCategory::Guid, _) => false,
        _ => true,
    };
    (!ok).then(|| mismatch_message(column, cell))
}

fn is_decimal_literal(s: &str) -> bool {
    DECIMAL_LITERAL.is_match(s.trim())
}

/// Validate every cell of a batch.
///
/// The grid has one row per submitted row and one outcome per declared
/// column. Short rows are padded with null, extra cells are ignored, and
/// columns unknown to the schema are reported valid.
pub fn validate_grid(
    schema: &TableSchema,
    batch: &SheetBatch,
    duplicate_columns: &[String],
) -> ValidationGrid {
    let width = batch.width();
    let columns: Vec<Option<&ColumnSchema>> =
        batch.columns.iter().map(|c| schema.column(c)).collect();

    let cells: Vec<Vec<CanonicalCell>> = (0..batch.rows.len())
        .map(|r| (0..width).map(|c| coerce(batch.cell(r, c))).collect())
        .collect();

    let mut results: Vec<Vec<CellOutcome>> = cells
        .iter()
        .map(|row| {
            row.iter()
                .zip(&columns)
                .map(|(cell, column)| match column {
                    Some(column) => validate_cell(cell, column),
                    None => CellOutcome::valid(),
                })
                .collect()
        })
        .collect();

    for (col, header) in batch.columns.iter().enumerate() {
        if columns[col].is_none() || !is_duplicate_checked(header, duplicate_columns) {
            continue;
        }
        flag_duplicates(&cells, col, &mut results);
    }

    let grid = ValidationGrid { results };
    log::debug!(
        "Validated {} rows x {} columns of '{}': {} problem cells",
        grid.row_count(),
        width,
        schema.name,
        grid.problem_count()
    );
    grid
}

fn is_duplicate_checked(header: &str, fragments: &[String]) -> bool {
    let header = header.to_lowercase();
    fragments
        .iter()
        .filter(|f| !f.trim().is_empty())
        .any(|f| header.contains(&f.trim().to_lowercase()))
}

/// Flag every occurrence of a repeated non-blank value; failures already
/// reported for a cell take precedence.
fn flag_duplicates(cells: &[Vec<CanonicalCell>], col: usize, results: &mut [Vec<CellOutcome>]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in cells {
        if !row[col].is_blank() {
            *counts.entry(row[col].printed()).or_default() += 1;
        }
    }

    for (row, outcomes) in cells.iter().zip(results.iter_mut()) {
        let cell = &row[col];
        if cell.is_blank() || counts.get(&cell.printed()).copied().unwrap_or(0) < 2 {
            continue;
        }
        if outcomes[col].is_valid() {
            outcomes[col] = CellOutcome::duplicate();
        }
    }
}

/// Structural check of a whole sheet against an existing table
pub fn verify_against(schema: &TableSchema, batch: &SheetBatch) -> VerificationReport {
    let mut report = VerificationReport::new();

    for header in &batch.columns {
        if !schema.has_column(header) {
            report.error(format!(
                "Column '{}' does not exist in table '{}'",
                header, schema.name
            ));
        }
    }

    for column in schema.column_names() {
        let present = batch.columns.iter().any(|h| h.eq_ignore_ascii_case(column));
        if !present {
            report.warn(format!(
                "Column '{}' from table '{}' is not present in the sheet data",
                column, schema.name
            ));
        }
    }

    let sample = batch.rows.len().min(VERIFY_SAMPLE_ROWS);
    for (col, header) in batch.columns.iter().enumerate() {
        let Some(column) = schema.column(header) else {
            continue;
        };
        let mismatch = (0..sample)
            .map(|r| coerce(batch.cell(r, col)))
            .filter(|cell| !cell.is_null())
            .find_map(|cell| check_sample_type(&cell, column));
        if let Some(message) = mismatch {
            report.warn(format!("Column '{}': {}", header, message));
        }
    }

    report
}
