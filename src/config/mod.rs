//! Run configuration.
//!
//! Configuration is a JSON document loaded from the path given on the
//! command line. Every field has a default so a minimal file only needs
//! to override what differs from the stock table layout. The remote
//! access token may also be supplied via the `ROWSYNC_TOKEN` environment
//! variable, which takes precedence over the file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the configured access token.
pub const TOKEN_ENV: &str = "ROWSYNC_TOKEN";

/// Top-level configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database: String,
    /// Name of the table holding the rows to reconcile.
    pub table: String,
    /// Bookkeeping column names in that table.
    pub columns: Columns,
    /// Remote content store settings.
    pub remote: RemoteConfig,
}

/// Names of the bookkeeping columns in the local table.
///
/// Every other column is a content column, eligible for the mapping file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Columns {
    /// Primary key column (unique per row).
    pub id: String,
    /// Logical id shared by all locale variants of one entity.
    pub common_id: String,
    /// Remote entry id column (null until the entry is created).
    pub entry_id: String,
    /// Remote version token column (numeric-as-string, null until created).
    pub entry_version: String,
    /// Publication status column (`Published` / `Draft` / null).
    pub status: String,
    /// Locale code column.
    pub locale: String,
}

/// Remote content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the content management API.
    pub base_url: String,
    /// Space (tenant) identifier.
    pub space: String,
    /// Schema id sent when creating entries.
    pub schema: String,
    /// Human-readable schema name, used by the `map` command lookup.
    pub schema_name: String,
    /// Remote field that carries the local common id.
    pub common_id_field: String,
    /// Locale used as the create-fallback when the remote store rejects
    /// an entry keyed by the rows' own locales.
    pub default_locale: String,
    /// Bearer token for all API calls (see [`TOKEN_ENV`]).
    pub access_token: String,
    /// Outbound request admission settings.
    pub rate_limit: RateLimitConfig,
}

/// Sliding-window rate limit for outbound remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum admitted calls per window.
    pub requests: usize,
    /// Window length in milliseconds.
    pub period_ms: u64,
    /// Delay before re-checking admission when the window is full.
    pub retry_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "rowsync.db".to_string(),
            table: "item_tab".to_string(),
            columns: Columns::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            common_id: "common_id".to_string(),
            entry_id: "entry_id".to_string(),
            entry_version: "entry_version".to_string(),
            status: "content_status".to_string(),
            locale: "content_locale".to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com".to_string(),
            space: String::new(),
            schema: String::new(),
            schema_name: String::new(),
            common_id_field: "commonId".to_string(),
            default_locale: "en-US".to_string(),
            access_token: String::new(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Conservative defaults: 5 requests per 3s, re-check every 3s.
        Self {
            requests: 5,
            period_ms: 3000,
            retry_ms: 3000,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, applying env overrides.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file is missing or not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("cannot parse {}: {e}", path.display()))
        })?;

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                config.remote.access_token = token;
            }
        }

        Ok(config)
    }

    /// Columns the mapping file must not map (they are bookkeeping,
    /// written by the engine itself).
    #[must_use]
    pub fn bookkeeping_columns(&self) -> [&str; 6] {
        [
            &self.columns.id,
            &self.columns.common_id,
            &self.columns.entry_id,
            &self.columns.entry_version,
            &self.columns.status,
            &self.columns.locale,
        ]
    }
}
