//! Shared fixtures for database-backed tests

use sqlx::{SqliteConnection, SqlitePool};

use crate::config::{Config, DatabaseConfig};
use crate::reconcile::LookupRules;

/// Single-connection in-memory pool
pub async fn memory_pool() -> SqlitePool {
    let config = DatabaseConfig {
        url: Some("sqlite::memory:".to_string()),
        ..DatabaseConfig::default()
    };
    crate::db::connect(&config).await.unwrap()
}

/// Lookup rules from the built-in config
pub fn counterparty_rules() -> LookupRules {
    Config::builtin().unwrap().lookup_rules().unwrap()
}

/// Payment terms, payment methods and posting groups
pub async fn seed_reference_tables(conn: &mut SqliteConnection) {
    for sql in [
        "CREATE TABLE paymentterms (PaymentTermId INTEGER PRIMARY KEY, PaymentTermName NVARCHAR(50) NOT NULL)",
        "INSERT INTO paymentterms VALUES (1, 'Net 30'), (2, 'Net 60')",
        "CREATE TABLE paymentmethods (PaymentMethodId INTEGER PRIMARY KEY, PaymentMethodCode NVARCHAR(20) NOT NULL)",
        "INSERT INTO paymentmethods VALUES (1, 'WIRE'), (2, 'CHECK')",
        r#"CREATE TABLE CounterPartyPostingGroups (
            CounterPartyPostingGroupId INTEGER PRIMARY KEY,
            CounterPartyPostingGroupName NVARCHAR(50) NOT NULL,
            CounterPartyPostingGroupType CHAR(1) NOT NULL
        )"#,
        "INSERT INTO CounterPartyPostingGroups VALUES (10, 'Domestic', 'C'), (11, 'Export', 'C'), (20, 'Domestic', 'V')",
    ] {
        sqlx::query(sql).execute(&mut *conn).await.unwrap();
    }
}

/// The Counterparties target table
pub async fn create_counterparties(conn: &mut SqliteConnection) {
    sqlx::query(
        r#"
        CREATE TABLE Counterparties (
            CounterpartyId INTEGER PRIMARY KEY AUTOINCREMENT,
            CounterpartyName NVARCHAR(50) NOT NULL,
            CounterpartyType CHAR(1),
            CounterpartyParentId INT,
            AP_PaymentTermId INT,
            AP_PaymentMethodId INT,
            AR_PaymentTermId INT,
            AR_PaymentMethodId INT,
            CustomerProfile INT,
            VendorProfile INT,
            CreditLimit DECIMAL(12, 2)
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .unwrap();
}

/// Header carrying every required Counterparties column
pub fn counterparty_columns() -> Vec<String> {
    [
        "CounterpartyName",
        "CounterpartyType",
        "CounterpartyParentId",
        "AP_PaymentTermId",
        "AP_PaymentMethodId",
        "AR_PaymentTermId",
        "AR_PaymentMethodId",
        "CustomerProfile",
        "VendorProfile",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}
