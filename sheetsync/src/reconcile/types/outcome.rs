//! Results produced by validation, verification and upsert

use serde::{Deserialize, Serialize};

/// Per-cell validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    #[serde(rename = "valid")]
    Valid,
    #[serde(rename = "type")]
    TypeMismatch,
    #[serde(rename = "length")]
    LengthExceeded,
    #[serde(rename = "duplicate")]
    Duplicate,
}

impl CellStatus {
    /// Get display label
    pub fn label(&self) -> &'static str {
        match self {
            CellStatus::Valid => "valid",
            CellStatus::TypeMismatch => "type-mismatch",
            CellStatus::LengthExceeded => "length-exceeded",
            CellStatus::Duplicate => "duplicate",
        }
    }
}

/// Status and message for one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutcome {
    pub status: CellStatus,
    pub message: String,
}

impl CellOutcome {
    pub fn valid() -> Self {
        CellOutcome {
            status: CellStatus::Valid,
            message: String::new(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        CellOutcome {
            status: CellStatus::TypeMismatch,
            message: message.into(),
        }
    }

    pub fn length_exceeded(max_length: u32) -> Self {
        CellOutcome {
            status: CellStatus::LengthExceeded,
            message: format!("Exceeds max length of {}", max_length),
        }
    }

    pub fn duplicate() -> Self {
        CellOutcome {
            status: CellStatus::Duplicate,
            message: "Duplicate value in name column".to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == CellStatus::Valid
    }
}

/// Row-major grid of outcomes, congruent with the submitted rows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationGrid {
    pub results: Vec<Vec<CellOutcome>>,
}

impl ValidationGrid {
    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.results.len()
    }

    /// Outcome at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Option<&CellOutcome> {
        self.results.get(row).and_then(|r| r.get(col))
    }

    /// Count of cells with the given status
    pub fn count(&self, status: CellStatus) -> usize {
        self.results
            .iter()
            .flatten()
            .filter(|c| c.status == status)
            .count()
    }

    /// Count of cells that are not valid
    pub fn problem_count(&self) -> usize {
        self.results
            .iter()
            .flatten()
            .filter(|c| !c.is_valid())
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

/// Whole-sheet structural verification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl VerificationReport {
    pub fn new() -> Self {
        VerificationReport {
            is_valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Outcome of a committed upsert batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSummary {
    /// Rows written (inserted + updated)
    pub applied: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Blank rows that were skipped
    pub skipped: usize,
}
