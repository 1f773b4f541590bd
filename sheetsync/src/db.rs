//! SQLite pool construction and cell binding helpers

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::reconcile::CanonicalCell;

pub(crate) type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Open a connection pool for the configured database
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let url = config
        .url
        .as_deref()
        .context("No database URL configured (set DATABASE_URL or database.url)")?;

    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database URL: {}", url))?;

    // Every connection to an in-memory database is a separate database
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let mut pool = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
    pool = if in_memory {
        pool.max_connections(1).idle_timeout(None).max_lifetime(None)
    } else {
        pool.max_connections(config.max_connections)
    };

    log::debug!("Connecting to {} (in_memory={})", url, in_memory);

    pool.connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {}", url))
}

/// Quote an identifier for SQL text
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bind a canonical cell as the next query parameter
pub(crate) fn bind_cell<'q>(query: SqliteQuery<'q>, cell: &CanonicalCell) -> SqliteQuery<'q> {
    match cell {
        CanonicalCell::Null => query.bind(None::<String>),
        CanonicalCell::String(s) => query.bind(s.clone()),
        CanonicalCell::Int(i) => query.bind(*i),
        CanonicalCell::Float(f) => query.bind(*f),
        CanonicalCell::Bool(b) => query.bind(*b),
    }
}

/// Decode a result column by its storage class
pub(crate) fn decode_cell(row: &SqliteRow, index: usize) -> Result<CanonicalCell, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(CanonicalCell::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let cell = match type_name.as_str() {
        "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => {
            CanonicalCell::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            CanonicalCell::Float(row.try_get_unchecked::<f64, _>(index)?)
        }
        _ => CanonicalCell::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(cell)
}
