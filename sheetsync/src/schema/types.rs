//! Live table schema as read from the database catalog

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed set of SQL type categories the validator understands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlTypeCategory {
    Integer,
    Boolean,
    Decimal,
    Text,
    /// Date and time types; only sample-checked by sheet verification
    Temporal,
    /// `uniqueidentifier`; only sample-checked by sheet verification
    Guid,
    /// Anything not modelled; always type-valid
    Unknown(String),
}

impl SqlTypeCategory {
    /// Classify a base SQL type name (case-insensitive, size already stripped)
    pub fn classify(base_type: &str) -> Self {
        match base_type.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" | "smallint" | "tinyint" => SqlTypeCategory::Integer,
            "bit" => SqlTypeCategory::Boolean,
            "decimal" | "numeric" | "float" | "real" | "money" | "smallmoney" => {
                SqlTypeCategory::Decimal
            }
            "varchar" | "nvarchar" | "char" | "nchar" | "text" | "ntext" => SqlTypeCategory::Text,
            "datetime" | "date" | "datetime2" | "smalldatetime" => SqlTypeCategory::Temporal,
            "uniqueidentifier" => SqlTypeCategory::Guid,
            other => SqlTypeCategory::Unknown(other.to_string()),
        }
    }

    /// Label used in type mismatch messages
    pub fn label(&self) -> &str {
        match self {
            SqlTypeCategory::Integer => "integer",
            SqlTypeCategory::Boolean => "boolean (0/1)",
            SqlTypeCategory::Decimal => "decimal",
            SqlTypeCategory::Text => "text",
            SqlTypeCategory::Temporal => "date/time",
            SqlTypeCategory::Guid => "uniqueidentifier",
            SqlTypeCategory::Unknown(name) => name,
        }
    }
}

/// Matches `NAME`, `NAME(50)`, `NAME (10, 2)`, `NAME(MAX)`
static DECLARED_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_ ]*?)\s*(?:\(\s*([^)]*?)\s*\))?\s*$")
        .expect("declared type pattern is valid")
});

/// Base types whose parenthesised size is a character/byte length
const LENGTH_BEARING: &[&str] = &[
    "varchar", "nvarchar", "char", "nchar", "varbinary", "binary", "character",
    "character varying",
];

/// Split a declared type such as `NVARCHAR(50)` into its base name and
/// maximum character length.
///
/// Length is only reported for character and binary types; `MAX`, negative
/// or unparsable sizes mean unbounded.
pub fn parse_declared_type(declared: &str) -> (String, Option<u32>) {
    let Some(caps) = DECLARED_TYPE.captures(declared) else {
        return (declared.trim().to_ascii_lowercase(), None);
    };

    let base = caps
        .get(1)
        .map(|m| m.as_str().trim().to_ascii_lowercase())
        .unwrap_or_default();

    let max_length = if LENGTH_BEARING.contains(&base.as_str()) {
        caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok())
    } else {
        None
    };

    (base, max_length)
}

/// One column of a live table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Name with the stored casing
    pub name: String,
    /// Base SQL type name, lower-cased (e.g. "nvarchar")
    pub data_type: String,
    pub category: SqlTypeCategory,
    pub nullable: bool,
    /// Maximum character length; None means unbounded
    pub max_length: Option<u32>,
}

impl ColumnSchema {
    /// Create a column from its declared type text
    pub fn from_declared(name: impl Into<String>, declared_type: &str, nullable: bool) -> Self {
        let (data_type, max_length) = parse_declared_type(declared_type);
        ColumnSchema {
            name: name.into(),
            category: SqlTypeCategory::classify(&data_type),
            data_type,
            nullable,
            max_length,
        }
    }
}

/// Columns of a live table, looked up case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Table name with the stored casing
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnSchema>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TableSchema {
    /// Build a schema; on case-insensitive name clashes the first column wins
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        let mut index = HashMap::new();
        for (i, column) in columns.iter().enumerate() {
            index.entry(column.name.to_lowercase()).or_insert(i);
        }
        TableSchema {
            name: name.into(),
            columns,
            index,
        }
    }

    /// Find a column by name, ignoring case
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.columns[i])
    }

    /// Check if a column exists, ignoring case
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Canonical casing of a column name
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.column(name).map(|c| c.name.as_str())
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_families() {
        for t in ["int", "BIGINT", "SmallInt", "tinyint", "integer"] {
            assert_eq!(SqlTypeCategory::classify(t), SqlTypeCategory::Integer, "{}", t);
        }
        assert_eq!(SqlTypeCategory::classify("BIT"), SqlTypeCategory::Boolean);
        for t in ["decimal", "numeric", "float", "real", "money"] {
            assert_eq!(SqlTypeCategory::classify(t), SqlTypeCategory::Decimal, "{}", t);
        }
        for t in ["varchar", "NVARCHAR", "char", "nchar", "text", "ntext"] {
            assert_eq!(SqlTypeCategory::classify(t), SqlTypeCategory::Text, "{}", t);
        }
        for t in ["datetime", "DATE", "datetime2", "smalldatetime"] {
            assert_eq!(SqlTypeCategory::classify(t), SqlTypeCategory::Temporal, "{}", t);
        }
        assert_eq!(SqlTypeCategory::classify("uniqueidentifier"), SqlTypeCategory::Guid);
        assert_eq!(
            SqlTypeCategory::classify("geography"),
            SqlTypeCategory::Unknown("geography".into())
        );
    }

    #[test]
    fn test_parse_declared_type() {
        assert_eq!(parse_declared_type("NVARCHAR(50)"), ("nvarchar".into(), Some(50)));
        assert_eq!(parse_declared_type("varchar ( 10 )"), ("varchar".into(), Some(10)));
        assert_eq!(parse_declared_type("VARCHAR(MAX)"), ("varchar".into(), None));
        assert_eq!(parse_declared_type("DECIMAL(10,2)"), ("decimal".into(), None));
        assert_eq!(parse_declared_type("INT"), ("int".into(), None));
        assert_eq!(parse_declared_type(""), ("".into(), None));
        assert_eq!(
            parse_declared_type("character varying(20)"),
            ("character varying".into(), Some(20))
        );
    }

    #[test]
    fn test_column_from_declared() {
        let col = ColumnSchema::from_declared("CounterpartyName", "NVARCHAR(50)", false);
        assert_eq!(col.category, SqlTypeCategory::Text);
        assert_eq!(col.max_length, Some(50));
        assert!(!col.nullable);
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_canonical() {
        let schema = TableSchema::new(
            "Counterparties",
            vec![
                ColumnSchema::from_declared("CounterpartyName", "NVARCHAR(50)", false),
                ColumnSchema::from_declared("AP_PaymentTermId", "INT", true),
            ],
        );

        assert!(schema.has_column("counterpartyname"));
        assert_eq!(schema.canonical_name("ap_paymenttermid"), Some("AP_PaymentTermId"));
        assert!(schema.column("Missing").is_none());
        assert_eq!(
            schema.column_names().collect::<Vec<_>>(),
            vec!["CounterpartyName", "AP_PaymentTermId"]
        );
    }
}
