//! Transactional upsert of a batch into its target table
//!
//! A batch is first checked against the live schema ([`preflight`]) and then
//! written row by row inside one transaction ([`apply`]). Rows are matched on
//! the key column: an `UPDATE` of the non-key columns runs first and an
//! `INSERT` follows when nothing matched. Key matching ignores case unless
//! the table is configured otherwise. Any failure rolls back every row.

use std::collections::HashSet;

use serde_json::Value as Json;
use sqlx::{SqliteConnection, SqlitePool};

use super::coerce::{coerce_row, is_blank_row};
use super::error::{ReconcileError, SchemaError};
use super::resolve::{LookupError, LookupResolver};
use super::types::{CanonicalCell, SheetBatch, UpsertSummary};
use crate::db::{bind_cell, quote_ident};
use crate::schema::TableSchema;

/// A batch that passed pre-flight, with canonical table and column names
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub table: String,
    pub columns: Vec<String>,
    pub key_index: usize,
    pub rows: Vec<Vec<Json>>,
    /// Match existing rows on the exact key text instead of `COLLATE NOCASE`
    pub case_sensitive_key: bool,
}

impl PreparedBatch {
    pub fn key_column(&self) -> &str {
        &self.columns[self.key_index]
    }

    pub fn with_case_sensitive_key(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_key = case_sensitive;
        self
    }
}

/// Check a batch against the live schema before opening a transaction.
///
/// Rejects an empty or repeated header, an out-of-range key index, columns
/// the table does not have and configured required columns the header lacks.
pub fn preflight(
    schema: &TableSchema,
    batch: SheetBatch,
    required_columns: &[String],
) -> Result<PreparedBatch, ReconcileError> {
    if batch.columns.is_empty() {
        return Err(ReconcileError::InvalidRequest(
            "No columns declared".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for column in &batch.columns {
        let normalized = column.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ReconcileError::InvalidRequest(
                "Column names cannot be blank".to_string(),
            ));
        }
        if !seen.insert(normalized) {
            return Err(ReconcileError::InvalidRequest(format!(
                "Column '{}' is declared more than once",
                column.trim()
            )));
        }
    }

    let key_index = batch.key_index();
    if key_index >= batch.columns.len() {
        return Err(ReconcileError::InvalidRequest(format!(
            "Key column index {} is out of range for {} columns",
            key_index,
            batch.columns.len()
        )));
    }

    let mut columns = Vec::with_capacity(batch.columns.len());
    for column in &batch.columns {
        let Some(canonical) = schema.canonical_name(column) else {
            return Err(SchemaError::ColumnNotFound {
                table: schema.name.clone(),
                column: column.trim().to_string(),
            }
            .into());
        };
        columns.push(canonical.to_string());
    }

    for required in required_columns {
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(required.trim())) {
            return Err(SchemaError::RequiredColumnMissing {
                table: schema.name.clone(),
                column: required.clone(),
            }
            .into());
        }
    }

    Ok(PreparedBatch {
        table: schema.name.clone(),
        columns,
        key_index,
        rows: batch.rows,
        case_sensitive_key: false,
    })
}

/// Apply a prepared batch in one transaction
pub async fn apply(
    pool: &SqlitePool,
    batch: &PreparedBatch,
    resolver: LookupResolver<'_>,
) -> Result<UpsertSummary, ReconcileError> {
    log::info!(
        "Applying {} rows to '{}' keyed on '{}'",
        batch.rows.len(),
        batch.table,
        batch.key_column()
    );

    let mut tx = pool.begin().await.map_err(ReconcileError::transaction)?;

    match apply_rows(&mut *tx, batch, resolver).await {
        Ok(summary) => {
            tx.commit().await.map_err(ReconcileError::transaction)?;
            log::info!(
                "Committed '{}': {} inserted, {} updated, {} skipped",
                batch.table,
                summary.inserted,
                summary.updated,
                summary.skipped
            );
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                log::warn!("Rollback of '{}' failed: {}", batch.table, rollback);
            }
            log::warn!("Rolled back '{}': {}", batch.table, e);
            Err(e)
        }
    }
}

/// Write every row on `conn` without managing the transaction
pub async fn apply_rows(
    conn: &mut SqliteConnection,
    batch: &PreparedBatch,
    resolver: LookupResolver<'_>,
) -> Result<UpsertSummary, ReconcileError> {
    let statements = Statements::new(batch);
    let width = batch.columns.len();
    let mut summary = UpsertSummary::default();

    for (row_index, raw) in batch.rows.iter().enumerate() {
        let cells = coerce_row(raw, width);
        if is_blank_row(&cells) {
            summary.skipped += 1;
            continue;
        }

        let mut resolved = Vec::with_capacity(width);
        for (column, cell) in batch.columns.iter().zip(cells) {
            let cell = resolver
                .resolve(&mut *conn, column, cell)
                .await
                .map_err(|e| match e {
                    LookupError::NotFound {
                        column,
                        value,
                        table,
                        ..
                    } => ReconcileError::ReferenceNotFound {
                        row_index,
                        column,
                        value,
                        table,
                    },
                    LookupError::Query { column, source } => ReconcileError::Transaction {
                        row_index: Some(row_index),
                        column: Some(column),
                        source,
                    },
                })?;
            resolved.push(cell);
        }

        let row_error = |source| ReconcileError::Transaction {
            row_index: Some(row_index),
            column: None,
            source,
        };

        let key = &resolved[batch.key_index];
        let matched = statements
            .update_or_find(&mut *conn, &resolved, key)
            .await
            .map_err(row_error)?;

        if matched {
            summary.updated += 1;
        } else {
            statements
                .insert(&mut *conn, &resolved)
                .await
                .map_err(row_error)?;
            summary.inserted += 1;
        }
        log::debug!(
            "Row {} ({}={}): {}",
            row_index,
            batch.key_column(),
            key,
            if matched { "updated" } else { "inserted" }
        );
    }

    summary.applied = summary.inserted + summary.updated;
    Ok(summary)
}

/// SQL text shared by every row of a batch
struct Statements {
    key_index: usize,
    /// `UPDATE`, or an existence check when the key is the only column
    update: String,
    key_only: bool,
    insert: String,
}

impl Statements {
    fn new(batch: &PreparedBatch) -> Self {
        let table = quote_ident(&batch.table);
        let key_only = batch.columns.len() == 1;
        let predicate = if batch.case_sensitive_key {
            format!("{} = ?", quote_ident(batch.key_column()))
        } else {
            format!("{} = ? COLLATE NOCASE", quote_ident(batch.key_column()))
        };

        let update = if key_only {
            format!("SELECT 1 FROM {} WHERE {} LIMIT 1", table, predicate)
        } else {
            let assignments: Vec<String> = batch
                .columns
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != batch.key_index)
                .map(|(_, c)| format!("{} = ?", quote_ident(c)))
                .collect();
            format!(
                "UPDATE {} SET {} WHERE {}",
                table,
                assignments.join(", "),
                predicate
            )
        };

        let names: Vec<String> = batch.columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders = vec!["?"; batch.columns.len()].join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            placeholders
        );

        Statements {
            key_index: batch.key_index,
            update,
            key_only,
            insert,
        }
    }

    /// Update the row matching `key`; true if one existed
    async fn update_or_find(
        &self,
        conn: &mut SqliteConnection,
        cells: &[CanonicalCell],
        key: &CanonicalCell,
    ) -> Result<bool, sqlx::Error> {
        if self.key_only {
            let row = bind_cell(sqlx::query(&self.update), key)
                .fetch_optional(&mut *conn)
                .await?;
            return Ok(row.is_some());
        }

        let mut query = sqlx::query(&self.update);
        for (i, cell) in cells.iter().enumerate() {
            if i != self.key_index {
                query = bind_cell(query, cell);
            }
        }
        let result = bind_cell(query, key).execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        cells: &[CanonicalCell],
    ) -> Result<(), sqlx::Error> {
        let mut query = sqlx::query(&self.insert);
        for cell in cells {
            query = bind_cell(query, cell);
        }
        query.execute(&mut *conn).await?;
        Ok(())
    }
}
