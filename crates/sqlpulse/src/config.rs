//! Configuration types for sqlpulse
//!
//! Loaded from YAML with `${VAR}` / `${VAR:-default}` environment
//! expansion. Each query entry pairs its SQL text with its type tag, so
//! a queries/types length mismatch cannot be expressed at all.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use validator::Validate;

use crate::error::{PulseError, Result};
use crate::types::SensitiveString;
use sqlpulse_rdbc::{ConnectionConfig, DatabaseType};

/// Pre-compiled regex for environment variable expansion
/// Pattern: ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex pattern is invalid - this is a bug")
});

/// How a query's result set maps onto events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    /// One event from the first row only; delta suffix applies
    #[serde(rename = "single-row")]
    SingleRow,
    /// One event per row; no delta tracking
    #[serde(rename = "multiple-rows")]
    MultipleRows,
    /// Rows are (field-name, field-value) pairs folded into one event
    #[serde(rename = "two-columns")]
    TwoColumns,
    /// Single-row variant keeping only the replication-delay column
    #[serde(rename = "show-slave-delay")]
    SlaveDelay,
}

impl QueryType {
    /// Stable tag, used in logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleRow => "single-row",
            Self::MultipleRows => "multiple-rows",
            Self::TwoColumns => "two-columns",
            Self::SlaveDelay => "show-slave-delay",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// SQL text executed verbatim each polling cycle
    pub sql: String,
    /// Result-set-to-event mapping
    #[serde(rename = "type")]
    pub query_type: QueryType,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Backend type: `mysql`, `postgres` or `sqlserver`
    #[serde(rename = "dbtype")]
    pub db_type: DatabaseType,

    /// Database host
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Port (backend default when unset)
    #[serde(default)]
    pub port: Option<u16>,

    /// Username
    pub username: String,

    /// Password (redacted everywhere it could leak)
    #[serde(default)]
    pub password: SensitiveString,

    /// Database name (required for postgres)
    #[serde(default)]
    pub database: Option<String>,

    /// Postgres `sslmode` (required for postgres)
    #[serde(default)]
    pub sslmode: Option<String>,
}

fn default_hostname() -> String {
    "127.0.0.1".to_string()
}

impl DatabaseConfig {
    /// Build the rdbc-layer connection configuration
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            db_type: self.db_type,
            hostname: self.hostname.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.expose_secret().to_string(),
            database: self.database.clone(),
            sslmode: self.sslmode.clone(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PulseConfig {
    /// Polling period in milliseconds
    #[serde(default = "default_period_ms")]
    #[validate(range(min = 100))]
    pub period_ms: u64,

    /// Database connection
    pub database: DatabaseConfig,

    /// Queries to execute each polling cycle, in order
    #[validate(length(min = 1, message = "there are no queries to execute"))]
    pub queries: Vec<QueryConfig>,

    /// Suffix marking counter-like columns for delta tracking
    #[serde(default = "default_delta_suffix")]
    pub delta_suffix: String,

    /// Diagnostic column kept by show-slave-delay queries
    #[serde(default = "default_slave_delay_column")]
    pub slave_delay_column: String,
}

fn default_period_ms() -> u64 {
    10_000
}

fn default_delta_suffix() -> String {
    "__DELTA".to_string()
}

fn default_slave_delay_column() -> String {
    "Seconds_Behind_Master".to_string()
}

impl PulseConfig {
    /// Load from a YAML file, expanding `${VAR}` references
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    /// Parse from YAML text, expanding `${VAR}` references
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let expanded = expand_env_vars(raw);
        let config: Self = serde_yaml::from_str(&expanded)
            .map_err(|e| PulseError::Config(format!("invalid config: {e}")))?;
        config.validate_semantics()?;
        Ok(config)
    }

    /// Polling period
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Full startup validation: field constraints plus cross-field rules
    pub fn validate_semantics(&self) -> Result<()> {
        self.validate()
            .map_err(|e| PulseError::Config(e.to_string()))?;

        if self.db_type() == DatabaseType::Postgres {
            if self.database.database.as_deref().unwrap_or("").is_empty() {
                return Err(PulseError::Config(
                    "database must be selected when using dbtype postgres".into(),
                ));
            }
            if self.database.sslmode.as_deref().unwrap_or("").is_empty() {
                return Err(PulseError::Config(
                    "sslmode must be selected when using dbtype postgres".into(),
                ));
            }
        }

        if self.delta_suffix.is_empty() {
            return Err(PulseError::Config("delta_suffix must not be empty".into()));
        }

        Ok(())
    }

    /// Backend type shorthand
    pub fn db_type(&self) -> DatabaseType {
        self.database.db_type
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references from the process
/// environment. Unset variables without a default expand to nothing.
fn expand_env_vars(raw: &str) -> String {
    ENV_VAR_REGEX
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            }
        })
        .into_owned()
}
