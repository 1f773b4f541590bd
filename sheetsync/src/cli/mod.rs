//! Command-line interface

pub mod handler;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "sheetsync",
    version,
    about = "Validate and upsert spreadsheet rows against a live database schema"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: $SHEETSYNC_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, overriding config and DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Pretty-print the JSON response
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored summary output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate every cell of a batch against the target table
    Validate {
        /// Batch JSON file ({"sheetName", "columns", "rows"})
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Check a batch's header and sample values against the target table
    Verify {
        /// Batch JSON file ({"sheetName", "columns", "rows"})
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Insert or update every row of a batch in one transaction
    Apply {
        /// Batch JSON file ({"sheetName", "columns", "rows", "keyColumnIndex"?})
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Show the live schema of a table
    Schema {
        /// Table name (case-insensitive)
        #[arg(short, long)]
        table: String,
    },
}
