//! Reconciliation of sheet batches against live tables
//!
//! [`Reconciler`] is the entry point: it reads the live schema for each
//! request and routes the batch to validation, verification or the upsert
//! executor. Nothing is cached between requests.

pub mod coerce;
pub mod error;
pub mod resolve;
pub mod types;
pub mod upsert;
pub mod validate;

pub use error::*;
pub use resolve::{LookupError, LookupResolver};
pub use types::*;
pub use upsert::PreparedBatch;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::schema::{TableSchema, table_schema};

/// Request router over a shared pool
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
    config: Config,
    rules: LookupRules,
}

impl Reconciler {
    /// Create a reconciler, building the lookup rule table from `config`
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, RuleError> {
        let rules = config.lookup_rules()?;
        log::debug!("Loaded {} lookup columns", rules.len());
        Ok(Reconciler {
            pool,
            config,
            rules,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Live schema of a table
    pub async fn schema(&self, table: &str) -> Result<TableSchema, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        table_schema(&mut conn, table).await
    }

    /// Per-cell validation; fails only when the table is missing
    pub async fn validate(&self, batch: &SheetBatch) -> Result<ValidationGrid, ReconcileError> {
        let schema = self.schema(&batch.sheet_name).await?;
        Ok(validate::validate_grid(
            &schema,
            batch,
            &self.config.validation.duplicate_columns,
        ))
    }

    /// Whole-sheet structural report; a missing table is reported, not raised
    pub async fn verify(&self, batch: &SheetBatch) -> Result<VerificationReport, ReconcileError> {
        match self.schema(&batch.sheet_name).await {
            Ok(schema) => Ok(validate::verify_against(&schema, batch)),
            Err(ReconcileError::Schema(e @ SchemaError::TableNotFound { .. })) => {
                let mut report = VerificationReport::new();
                report.error(e.to_string());
                Ok(report)
            }
            Err(e) => Err(e),
        }
    }

    /// Pre-flight the batch, then upsert every row in one transaction
    pub async fn apply(&self, batch: SheetBatch) -> Result<UpsertSummary, ReconcileError> {
        let schema = self.schema(&batch.sheet_name).await?;
        let required = self.config.required_columns(&schema.name);
        let prepared = upsert::preflight(&schema, batch, required)?
            .with_case_sensitive_key(self.config.case_sensitive_key(&schema.name));
        upsert::apply(&self.pool, &prepared, LookupResolver::new(&self.rules)).await
    }
}
