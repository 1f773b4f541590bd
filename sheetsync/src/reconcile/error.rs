//! Error taxonomy for reconciliation requests

/// Structural mismatch between a request and the live schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Target table does not exist
    TableNotFound { table: String },
    /// A declared input column is not in the table
    ColumnNotFound { table: String, column: String },
    /// A column configured as required is missing from the input
    RequiredColumnMissing { table: String, column: String },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::TableNotFound { table } => {
                write!(f, "Table '{}' does not exist in the database", table)
            }
            SchemaError::ColumnNotFound { table, column } => {
                write!(f, "Column '{}' does not exist in table '{}'", column, table)
            }
            SchemaError::RequiredColumnMissing { table, column } => write!(
                f,
                "Required column '{}' is missing from the sheet for table '{}'",
                column, table
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Any failure of a reconciliation request
#[derive(Debug)]
pub enum ReconcileError {
    /// Request rejected against the live schema before any write
    Schema(SchemaError),
    /// Malformed request (empty header, duplicate header, bad key index)
    InvalidRequest(String),
    /// A lookup column value has no match; the batch was rolled back
    ReferenceNotFound {
        row_index: usize,
        column: String,
        value: String,
        table: String,
    },
    /// Lower-level failure while applying a row; the batch was rolled back
    Transaction {
        row_index: Option<usize>,
        column: Option<String>,
        source: sqlx::Error,
    },
    /// Catalog or connection failure outside a batch
    Database(sqlx::Error),
}

impl ReconcileError {
    /// Whether the error was raised inside the batch transaction
    pub fn rolled_back(&self) -> bool {
        matches!(
            self,
            ReconcileError::ReferenceNotFound { .. } | ReconcileError::Transaction { .. }
        )
    }

    /// Row index the error is attributed to, if any
    pub fn row_index(&self) -> Option<usize> {
        match self {
            ReconcileError::ReferenceNotFound { row_index, .. } => Some(*row_index),
            ReconcileError::Transaction { row_index, .. } => *row_index,
            _ => None,
        }
    }

    pub(crate) fn transaction(source: sqlx::Error) -> Self {
        ReconcileError::Transaction {
            row_index: None,
            column: None,
            source,
        }
    }
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Schema(e) => write!(f, "{}", e),
            ReconcileError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ReconcileError::ReferenceNotFound {
                row_index,
                column,
                value,
                table,
            } => write!(
                f,
                "Error processing column '{}' with value '{}' (row {}): no match in table '{}'",
                column, value, row_index, table
            ),
            ReconcileError::Transaction {
                row_index,
                column,
                source,
            } => {
                match (row_index, column) {
                    (Some(row), Some(col)) => {
                        write!(f, "Error processing column '{}' (row {}): ", col, row)?
                    }
                    (Some(row), None) => write!(f, "Error applying row {}: ", row)?,
                    _ => {}
                }
                write!(f, "{}", source)
            }
            ReconcileError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Schema(e) => Some(e),
            ReconcileError::Transaction { source, .. } => Some(source),
            ReconcileError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for ReconcileError {
    fn from(e: SchemaError) -> Self {
        ReconcileError::Schema(e)
    }
}

impl From<sqlx::Error> for ReconcileError {
    fn from(e: sqlx::Error) -> Self {
        ReconcileError::Database(e)
    }
}
