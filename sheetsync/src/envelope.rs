//! Uniform `{success, message, data}` response envelope

use serde::{Deserialize, Serialize};

use crate::reconcile::{ReconcileError, UpsertSummary, ValidationGrid, VerificationReport};
use crate::schema::TableSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    /// `null` when the request failed without a payload
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn fail_with(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Envelope for a failed request
pub fn error_response<T>(err: &ReconcileError) -> ApiResponse<T> {
    if err.rolled_back() {
        ApiResponse::fail(format!("Transaction rolled back. {}", err))
    } else {
        ApiResponse::fail(err.to_string())
    }
}

/// Validation results; the grid (`{"results": [[...]]}`) is returned whether
/// or not it is clean
pub fn validation_response(
    result: Result<ValidationGrid, ReconcileError>,
) -> ApiResponse<ValidationGrid> {
    match result {
        Ok(grid) => {
            let problems = grid.problem_count();
            if problems == 0 {
                ApiResponse::ok("Validation passed", grid)
            } else {
                ApiResponse::fail_with(
                    format!("Validation found {} problem cell(s)", problems),
                    grid,
                )
            }
        }
        Err(e) => error_response(&e),
    }
}

pub fn verification_response(
    result: Result<VerificationReport, ReconcileError>,
) -> ApiResponse<VerificationReport> {
    match result {
        Ok(report) => {
            let message = if report.is_valid {
                "Verification passed"
            } else {
                "Verification failed"
            };
            ApiResponse::ok(message, report)
        }
        Err(e) => error_response(&e),
    }
}

pub fn apply_response(
    result: Result<UpsertSummary, ReconcileError>,
) -> ApiResponse<UpsertSummary> {
    match result {
        Ok(summary) => ApiResponse::ok("Data inserted/updated successfully", summary),
        Err(e) => error_response(&e),
    }
}

pub fn schema_response(result: Result<TableSchema, ReconcileError>) -> ApiResponse<TableSchema> {
    match result {
        Ok(schema) => {
            let message = format!("Table '{}' has {} columns", schema.name, schema.columns.len());
            ApiResponse::ok(message, schema)
        }
        Err(e) => error_response(&e),
    }
}
