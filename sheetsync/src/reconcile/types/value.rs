//! Canonical cell representation shared by the validator and resolver

use serde::{Deserialize, Serialize};

/// A single input value after coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum CanonicalCell {
    /// Null/empty value
    #[default]
    Null,
    /// String value (kept verbatim, never trimmed)
    String(String),
    /// Whole number
    Int(i64),
    /// Floating point / decimal
    Float(f64),
    /// Boolean
    Bool(bool),
}

impl CanonicalCell {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalCell::Null)
    }

    /// Null or a string holding only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CanonicalCell::Null => true,
            CanonicalCell::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Printed form used for type parsing, length checks and messages.
    ///
    /// Strings are returned as-is; null prints as the empty string.
    pub fn printed(&self) -> String {
        match self {
            CanonicalCell::Null => String::new(),
            CanonicalCell::String(s) => s.clone(),
            CanonicalCell::Int(i) => i.to_string(),
            CanonicalCell::Float(f) => f.to_string(),
            CanonicalCell::Bool(b) => b.to_string(),
        }
    }
}

impl std::fmt::Display for CanonicalCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanonicalCell::Null => write!(f, "(null)"),
            other => write!(f, "{}", other.printed()),
        }
    }
}

impl From<&str> for CanonicalCell {
    fn from(s: &str) -> Self {
        CanonicalCell::String(s.to_string())
    }
}

impl From<String> for CanonicalCell {
    fn from(s: String) -> Self {
        CanonicalCell::String(s)
    }
}

impl From<i64> for CanonicalCell {
    fn from(i: i64) -> Self {
        CanonicalCell::Int(i)
    }
}

impl From<f64> for CanonicalCell {
    fn from(f: f64) -> Self {
        CanonicalCell::Float(f)
    }
}

impl From<bool> for CanonicalCell {
    fn from(b: bool) -> Self {
        CanonicalCell::Bool(b)
    }
}
