//! Lookup rule types for reference column resolution
//!
//! Lookup rules let a sheet carry human-readable labels (a payment term name,
//! a posting group name) in columns whose table stores foreign-key ids. Each
//! rule names the table to search, the column holding the label and the
//! column holding the id to persist.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::value::CanonicalCell;
use crate::reconcile::coerce::coerce;

/// A configured mapping from input columns to a single-row lookup query.
///
/// For example, to resolve a vendor profile by its name:
/// - `columns`: ["VendorProfile"]
/// - `table`: "CounterPartyPostingGroups"
/// - `match_column`: "CounterPartyPostingGroupName"
/// - `id_column`: "CounterPartyPostingGroupId"
/// - `filter`: CounterPartyPostingGroupType = 'V'
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRule {
    /// Input column names this rule applies to (case-insensitive)
    pub columns: Vec<String>,
    /// Table searched for the label
    pub table: String,
    /// Column compared against the input value
    pub match_column: String,
    /// Column whose value replaces the label
    pub id_column: String,
    /// Extra equality predicate, e.g. to separate customer and vendor rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<LookupFilter>,
    /// Human label used in error messages (e.g. "Vendor Profile")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Compare labels byte-for-byte instead of ignoring ASCII case
    #[serde(default)]
    pub case_sensitive: bool,
}

impl LookupRule {
    /// Create a new rule for a single column
    pub fn new(
        column: impl Into<String>,
        table: impl Into<String>,
        match_column: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        LookupRule {
            columns: vec![column.into()],
            table: table.into(),
            match_column: match_column.into(),
            id_column: id_column.into(),
            filter: None,
            label: None,
            case_sensitive: false,
        }
    }

    /// Add an extra equality predicate
    pub fn with_filter(
        mut self,
        column: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.filter = Some(LookupFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Set the human label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label for messages, falling back to the table name
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.table)
    }

    fn check(&self) -> Result<(), RuleError> {
        let blank = [
            ("table", self.table.as_str()),
            ("match_column", self.match_column.as_str()),
            ("id_column", self.id_column.as_str()),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());

        if let Some((field, _)) = blank {
            return Err(RuleError::BlankIdentifier {
                table: self.table.clone(),
                field,
            });
        }
        if self.columns.iter().all(|c| c.trim().is_empty()) {
            return Err(RuleError::NoColumns {
                table: self.table.clone(),
            });
        }
        if let Some(filter) = &self.filter {
            if filter.column.trim().is_empty() {
                return Err(RuleError::BlankIdentifier {
                    table: self.table.clone(),
                    field: "filter.column",
                });
            }
        }
        Ok(())
    }
}

/// Extra `AND <column> = <value>` predicate on a lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupFilter {
    pub column: String,
    pub value: serde_json::Value,
}

impl LookupFilter {
    /// Filter value as a bindable cell
    pub fn cell(&self) -> CanonicalCell {
        coerce(&self.value)
    }
}

/// Error building the lookup rule table
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Two rules claim the same input column
    ColumnClaimedTwice {
        column: String,
        first_table: String,
        second_table: String,
    },
    /// A required identifier is empty
    BlankIdentifier { table: String, field: &'static str },
    /// A rule lists no input columns
    NoColumns { table: String },
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::ColumnClaimedTwice {
                column,
                first_table,
                second_table,
            } => write!(
                f,
                "Column '{}' has lookup rules against both '{}' and '{}'",
                column, first_table, second_table
            ),
            RuleError::BlankIdentifier { table, field } => {
                write!(f, "Lookup rule for table '{}' has an empty {}", table, field)
            }
            RuleError::NoColumns { table } => {
                write!(f, "Lookup rule for table '{}' lists no columns", table)
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// Lookup rules keyed by lower-cased input column name
#[derive(Debug, Clone, Default)]
pub struct LookupRules {
    by_column: HashMap<String, Arc<LookupRule>>,
}

impl LookupRules {
    /// Build the rule table, rejecting overlapping or incomplete rules
    pub fn new(rules: Vec<LookupRule>) -> Result<Self, RuleError> {
        let mut by_column: HashMap<String, Arc<LookupRule>> = HashMap::new();

        for rule in rules {
            rule.check()?;
            let rule = Arc::new(rule);
            for column in rule.columns.iter().filter(|c| !c.trim().is_empty()) {
                let key = normalize(column);
                if let Some(existing) = by_column.get(&key) {
                    return Err(RuleError::ColumnClaimedTwice {
                        column: column.clone(),
                        first_table: existing.table.clone(),
                        second_table: rule.table.clone(),
                    });
                }
                by_column.insert(key, Arc::clone(&rule));
            }
        }

        Ok(LookupRules { by_column })
    }

    /// Rule for an input column, if any
    pub fn get(&self, column: &str) -> Option<&LookupRule> {
        self.by_column.get(&normalize(column)).map(|r| r.as_ref())
    }

    /// Check if a column is resolved through a lookup
    pub fn is_lookup(&self, column: &str) -> bool {
        self.by_column.contains_key(&normalize(column))
    }

    pub fn len(&self) -> usize {
        self.by_column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }
}

/// Per-table static rules
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRules {
    /// Table name (case-insensitive)
    pub name: String,
    /// Columns that every upsert batch for this table must declare
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Match upsert keys exactly instead of ignoring case
    #[serde(default)]
    pub case_sensitive_key: bool,
}

fn normalize(column: &str) -> String {
    column.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_terms() -> LookupRule {
        LookupRule {
            columns: vec!["AP_PaymentTermId".into(), "AR_PaymentTermId".into()],
            ..LookupRule::new("", "paymentterms", "PaymentTermName", "PaymentTermId")
        }
    }

    #[test]
    fn test_rules_match_case_insensitively() {
        let rules = LookupRules::new(vec![payment_terms()]).unwrap();

        assert_eq!(rules.len(), 2);
        assert!(rules.is_lookup("ap_paymenttermid"));
        assert!(rules.is_lookup(" AR_PAYMENTTERMID "));
        assert!(!rules.is_lookup("CounterpartyName"));
        assert_eq!(rules.get("Ap_PaymentTermId").unwrap().table, "paymentterms");
    }

    #[test]
    fn test_column_claimed_twice_errors() {
        let clash = LookupRule::new("ap_paymenttermid", "otherterms", "Name", "Id");
        let result = LookupRules::new(vec![payment_terms(), clash]);
        assert!(matches!(
            result,
            Err(RuleError::ColumnClaimedTwice { .. })
        ));
    }

    #[test]
    fn test_blank_identifier_errors() {
        let rule = LookupRule::new("VendorProfile", "groups", "  ", "Id");
        let result = LookupRules::new(vec![rule]);
        assert_eq!(
            result.unwrap_err(),
            RuleError::BlankIdentifier {
                table: "groups".into(),
                field: "match_column"
            }
        );
    }

    #[test]
    fn test_filter_value_coerces_to_cell() {
        let rule = LookupRule::new("VendorProfile", "groups", "Name", "Id")
            .with_filter("GroupType", "V")
            .with_label("Vendor Profile");
        let filter = rule.filter.as_ref().unwrap();
        assert_eq!(filter.cell(), CanonicalCell::from("V"));
        assert_eq!(rule.display_label(), "Vendor Profile");
    }

    #[test]
    fn test_deserialize_rule_from_toml() {
        let rule: LookupRule = toml::from_str(
            r#"
            columns = ["CustomerProfile"]
            table = "CounterPartyPostingGroups"
            match_column = "CounterPartyPostingGroupName"
            id_column = "CounterPartyPostingGroupId"
            filter = { column = "CounterPartyPostingGroupType", value = "C" }
            "#,
        )
        .unwrap();
        assert!(!rule.case_sensitive);
        assert_eq!(rule.filter.unwrap().value, serde_json::json!("C"));
    }
}
