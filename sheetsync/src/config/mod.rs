//! Configuration loading
//!
//! Search order: explicit path, `SHEETSYNC_CONFIG`, the per-user config
//! directory, then the built-in defaults. `DATABASE_URL` always overrides the
//! configured database URL.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::reconcile::{LookupRule, LookupRules, RuleError, TableRules};

/// Built-in configuration
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

const CONFIG_ENV: &str = "SHEETSYNC_CONFIG";
const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub validation: ValidationConfig,
    #[serde(rename = "lookup")]
    pub lookups: Vec<LookupRule>,
    #[serde(rename = "table")]
    pub tables: Vec<TableRules>,
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// e.g. `sqlite://sheetsync.db` or `sqlite::memory:`
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

/// Validation path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Name fragments selecting columns checked for duplicate values
    pub duplicate_columns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            duplicate_columns: vec!["name".to_string()],
        }
    }
}

impl Config {
    /// Load configuration using the process environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Load configuration, reading environment variables through `env`
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => env(CONFIG_ENV)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .or_else(|| user_config_path().filter(|p| p.exists())),
        };

        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                log::debug!("No config file found, using built-in defaults");
                Self::builtin()?
            }
        };

        if let Some(url) = env(DATABASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.database.url = Some(url);
        }

        // Surface rule problems at load time rather than on first request
        config.lookup_rules()?;

        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse config text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// The built-in configuration
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG).context("Built-in config is invalid")
    }

    /// Build the lookup rule table
    pub fn lookup_rules(&self) -> Result<LookupRules, RuleError> {
        LookupRules::new(self.lookups.clone())
    }

    /// Rules configured for a table (case-insensitive)
    pub fn table_rules(&self, table: &str) -> Option<&TableRules> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table.trim()))
    }

    /// Required columns configured for a table
    pub fn required_columns(&self, table: &str) -> &[String] {
        self.table_rules(table)
            .map(|t| t.required_columns.as_slice())
            .unwrap_or(&[])
    }

    /// Whether upsert keys for a table must match case exactly
    pub fn case_sensitive_key(&self, table: &str) -> bool {
        self.table_rules(table).is_some_and(|t| t.case_sensitive_key)
    }
}

/// `<config dir>/sheetsync/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sheetsync").join("config.toml"))
}
