//! Command dispatch: load config, connect, run one request, print the envelope

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use super::{Cli, Commands};
use crate::config::Config;
use crate::envelope::{
    ApiResponse, apply_response, schema_response, validation_response, verification_response,
};
use crate::reconcile::{CellStatus, Reconciler, SheetBatch};

/// Run a parsed command line. Returns whether the response reported success.
pub async fn run(cli: Cli) -> Result<bool> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = Some(url);
    }

    let pool = crate::db::connect(&config.database).await?;
    let reconciler = Reconciler::new(pool, config).context("Invalid lookup rules")?;

    match cli.command {
        Commands::Validate { input } => {
            let batch = read_batch(&input)?;
            let response = validation_response(reconciler.validate(&batch).await);
            if let Some(grid) = &response.data {
                let mut summary = format!("{} rows checked", grid.row_count());
                for status in [
                    CellStatus::TypeMismatch,
                    CellStatus::LengthExceeded,
                    CellStatus::Duplicate,
                ] {
                    let n = grid.count(status);
                    if n > 0 {
                        summary.push_str(&format!(", {} {}", n, status.label()));
                    }
                }
                eprintln!("{}", summary.dimmed());
            }
            emit(&response, cli.pretty)
        }
        Commands::Verify { input } => {
            let batch = read_batch(&input)?;
            let response = verification_response(reconciler.verify(&batch).await);
            if let Some(report) = &response.data {
                for error in &report.errors {
                    eprintln!("{} {}", "error:".red().bold(), error);
                }
                for warning in &report.warnings {
                    eprintln!("{} {}", "warning:".yellow().bold(), warning);
                }
            }
            emit(&response, cli.pretty)
        }
        Commands::Apply { input } => {
            let batch = read_batch(&input)?;
            let response = apply_response(reconciler.apply(batch).await);
            if let Some(summary) = &response.data {
                eprintln!(
                    "{} inserted, {} updated, {} skipped",
                    summary.inserted.to_string().bright_green(),
                    summary.updated.to_string().bright_cyan(),
                    summary.skipped.to_string().dimmed()
                );
            }
            emit(&response, cli.pretty)
        }
        Commands::Schema { table } => {
            let response = schema_response(reconciler.schema(&table).await);
            if let Some(schema) = &response.data {
                for column in &schema.columns {
                    let length = column
                        .max_length
                        .map(|n| format!("({})", n))
                        .unwrap_or_default();
                    let null = if column.nullable { "" } else { " not null" };
                    eprintln!(
                        "  {} {}{}{}",
                        column.name.bold(),
                        column.data_type.cyan(),
                        length,
                        null.dimmed()
                    );
                }
            }
            emit(&response, cli.pretty)
        }
    }
}

/// Read a batch JSON file
fn read_batch(path: &Path) -> Result<SheetBatch> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    if content.trim().is_empty() {
        anyhow::bail!("Input file is empty: {}", path.display());
    }

    let batch: SheetBatch = serde_json::from_str(&content)
        .with_context(|| format!("Invalid batch JSON in: {}", path.display()))?;
    log::info!(
        "Read batch for '{}': {} columns, {} rows",
        batch.sheet_name,
        batch.columns.len(),
        batch.rows.len()
    );
    Ok(batch)
}

/// Print the envelope on stdout and its message on stderr
fn emit<T: Serialize>(response: &ApiResponse<T>, pretty: bool) -> Result<bool> {
    let json = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    }
    .context("Failed to format JSON output")?;
    println!("{}", json);

    if response.success {
        eprintln!("{}", response.message.bright_green().bold());
    } else {
        eprintln!("{}", response.message.bright_red().bold());
    }
    Ok(response.success)
}
