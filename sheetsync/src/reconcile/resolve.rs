//! Lookup resolution of reference columns
//!
//! A column with a configured rule carries a label on input and an id in the
//! table. The resolver swaps one for the other with a single-row query run on
//! the batch's own connection, so ids of rows written earlier in the same
//! batch are visible.

use sqlx::SqliteConnection;

use super::types::{CanonicalCell, LookupRule, LookupRules};
use crate::db::{bind_cell, decode_cell, quote_ident};

/// Failure to resolve a reference value
#[derive(Debug)]
pub enum LookupError {
    /// No row matched the label
    NotFound {
        column: String,
        value: String,
        table: String,
        match_column: String,
    },
    /// The lookup query itself failed
    Query { column: String, source: sqlx::Error },
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::NotFound {
                column,
                value,
                table,
                match_column,
            } => write!(
                f,
                "'{}' for column '{}' not found in {}.{}",
                value, column, table, match_column
            ),
            LookupError::Query { column, source } => {
                write!(f, "Lookup for column '{}' failed: {}", column, source)
            }
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::Query { source, .. } => Some(source),
            LookupError::NotFound { .. } => None,
        }
    }
}

/// Resolves reference columns through the configured rules
#[derive(Debug, Clone, Copy)]
pub struct LookupResolver<'a> {
    rules: &'a LookupRules,
}

impl<'a> LookupResolver<'a> {
    pub fn new(rules: &'a LookupRules) -> Self {
        LookupResolver { rules }
    }

    /// Resolve one cell.
    ///
    /// Columns without a rule pass through unchanged; blank values on rule
    /// columns resolve to null without querying.
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        cell: CanonicalCell,
    ) -> Result<CanonicalCell, LookupError> {
        let Some(rule) = self.rules.get(column) else {
            return Ok(cell);
        };
        if cell.is_blank() {
            return Ok(CanonicalCell::Null);
        }

        let sql = lookup_sql(rule);
        let mut query = bind_cell(sqlx::query(&sql), &cell);
        if let Some(filter) = &rule.filter {
            query = bind_cell(query, &filter.cell());
        }

        let row = query
            .fetch_optional(&mut *conn)
            .await
            .map_err(|source| LookupError::Query {
                column: column.to_string(),
                source,
            })?;

        let id = match row {
            Some(row) => decode_cell(&row, 0).map_err(|source| LookupError::Query {
                column: column.to_string(),
                source,
            })?,
            None => CanonicalCell::Null,
        };

        // A matched row without an id counts as a miss
        if id.is_null() {
            log::warn!(
                "{} '{}' not found in {} (column '{}')",
                rule.display_label(),
                cell,
                rule.table,
                column
            );
            return Err(LookupError::NotFound {
                column: column.to_string(),
                value: cell.printed(),
                table: rule.table.clone(),
                match_column: rule.match_column.clone(),
            });
        }

        log::debug!("Resolved {} '{}' -> {}", column, cell, id);
        Ok(id)
    }
}

/// `SELECT <id> FROM <table> WHERE <match> = ? [AND <filter> = ?] LIMIT 1`
fn lookup_sql(rule: &LookupRule) -> String {
    let collate = if rule.case_sensitive {
        ""
    } else {
        " COLLATE NOCASE"
    };
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = ?{}",
        quote_ident(&rule.id_column),
        quote_ident(&rule.table),
        quote_ident(&rule.match_column),
        collate
    );
    if let Some(filter) = &rule.filter {
        sql.push_str(&format!(" AND {} = ?", quote_ident(&filter.column)));
    }
    sql.push_str(" LIMIT 1");
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counterparty_rules, memory_pool, seed_reference_tables};

    #[test]
    fn test_lookup_sql_shape() {
        let rule = LookupRule::new("VendorProfile", "Groups", "GroupName", "GroupId")
            .with_filter("GroupType", "V");
        assert_eq!(
            lookup_sql(&rule),
            r#"SELECT "GroupId" FROM "Groups" WHERE "GroupName" = ? COLLATE NOCASE AND "GroupType" = ? LIMIT 1"#
        );

        let exact = LookupRule {
            case_sensitive: true,
            ..LookupRule::new("c", "t", "m", "i")
        };
        assert_eq!(
            lookup_sql(&exact),
            r#"SELECT "i" FROM "t" WHERE "m" = ? LIMIT 1"#
        );
    }

    #[tokio::test]
    async fn test_column_without_rule_passes_through() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let rules = counterparty_rules();
        let resolver = LookupResolver::new(&rules);

        let out = resolver
            .resolve(&mut conn, "CounterpartyName", "Acme".into())
            .await
            .unwrap();
        assert_eq!(out, CanonicalCell::from("Acme"));
    }

    #[tokio::test]
    async fn test_blank_value_resolves_to_null_without_query() {
        // No reference tables exist: a query would fail
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let rules = counterparty_rules();
        let resolver = LookupResolver::new(&rules);

        let out = resolver
            .resolve(&mut conn, "VendorProfile", "   ".into())
            .await
            .unwrap();
        assert_eq!(out, CanonicalCell::Null);
    }

    #[tokio::test]
    async fn test_filtered_lookup_resolves_id() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_reference_tables(&mut conn).await;
        let rules = counterparty_rules();
        let resolver = LookupResolver::new(&rules);

        // "Domestic" exists for both customers (C) and vendors (V)
        let vendor = resolver
            .resolve(&mut conn, "vendorprofile", "Domestic".into())
            .await
            .unwrap();
        let customer = resolver
            .resolve(&mut conn, "CustomerProfile", "domestic".into())
            .await
            .unwrap();
        assert_eq!(vendor, CanonicalCell::Int(20));
        assert_eq!(customer, CanonicalCell::Int(10));
    }

    #[tokio::test]
    async fn test_filter_excludes_other_kind() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_reference_tables(&mut conn).await;
        let rules = counterparty_rules();
        let resolver = LookupResolver::new(&rules);

        // "Export" is only a customer group
        let err = resolver
            .resolve(&mut conn, "VendorProfile", "Export".into())
            .await
            .unwrap_err();
        match err {
            LookupError::NotFound { column, value, .. } => {
                assert_eq!(column, "VendorProfile");
                assert_eq!(value, "Export");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_lookup_table_is_query_error() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let rules = counterparty_rules();
        let resolver = LookupResolver::new(&rules);

        let err = resolver
            .resolve(&mut conn, "AP_PaymentTermId", "Net 30".into())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Query { .. }));
    }

    #[tokio::test]
    async fn test_matched_row_without_id_is_not_found() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        sqlx::query("CREATE TABLE regions (RegionName TEXT, RegionId INT)")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO regions VALUES ('Orphan', NULL), ('North', 7)")
            .execute(&mut *conn)
            .await
            .unwrap();
        let rules =
            LookupRules::new(vec![LookupRule::new("Region", "regions", "RegionName", "RegionId")])
                .unwrap();
        let resolver = LookupResolver::new(&rules);

        let err = resolver
            .resolve(&mut conn, "Region", "orphan".into())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound { ref value, .. } if value == "orphan"));

        let id = resolver
            .resolve(&mut conn, "region", "north".into())
            .await
            .unwrap();
        assert_eq!(id, CanonicalCell::Int(7));
    }
}
