//! Catalog queries against the live database
//!
//! Table existence comes from `sqlite_master` (views count as tables) and
//! column metadata from `pragma_table_info`. Both are read fresh on every
//! call; nothing is cached across requests.

use sqlx::{Row, SqliteConnection};

use super::types::{ColumnSchema, TableSchema};
use crate::reconcile::{ReconcileError, SchemaError};

/// Canonical (stored) name of a table, matched case-insensitively
pub async fn find_table(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type IN ('table', 'view')
          AND name = ? COLLATE NOCASE
        ORDER BY CASE WHEN name = ? THEN 0 ELSE 1 END
        LIMIT 1
        "#,
    )
    .bind(name.trim())
    .bind(name.trim())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| r.try_get::<String, _>("name")).transpose()
}

/// Check whether a table exists
pub async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool, sqlx::Error> {
    Ok(find_table(conn, name).await?.is_some())
}

/// Read the live schema of a table
pub async fn table_schema(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<TableSchema, ReconcileError> {
    let Some(table) = find_table(conn, name).await? else {
        return Err(SchemaError::TableNotFound {
            table: name.to_string(),
        }
        .into());
    };

    let rows = sqlx::query(
        r#"
        SELECT name, type, "notnull" AS not_null
        FROM pragma_table_info(?)
        ORDER BY cid
        "#,
    )
    .bind(&table)
    .fetch_all(&mut *conn)
    .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let column_name: String = row.try_get("name")?;
        let declared_type: String = row.try_get("type")?;
        let not_null: i64 = row.try_get("not_null")?;
        columns.push(ColumnSchema::from_declared(
            column_name,
            &declared_type,
            not_null == 0,
        ));
    }

    log::debug!("Read schema for '{}': {} columns", table, columns.len());

    Ok(TableSchema::new(table, columns))
}
