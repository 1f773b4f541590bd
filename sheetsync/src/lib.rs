//! Reconcile spreadsheet rows with a live relational table.
//!
//! A batch (sheet name, header, rows) can be validated cell by cell, verified
//! structurally, or upserted in a single transaction with reference columns
//! resolved from labels to ids through configured lookup rules.

pub mod cli;
pub mod config;
pub mod db;
pub mod envelope;
pub mod reconcile;
pub mod schema;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use envelope::ApiResponse;
pub use reconcile::{ReconcileError, Reconciler, SheetBatch};
