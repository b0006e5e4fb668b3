//! Error types for the sqlpulse runtime
//!
//! Two failure tiers, mirroring the driver's control flow: row-level
//! problems are logged and skip to the next configured query, while
//! query-execution and connection problems abort the whole polling
//! cycle and propagate to the supervisor.

use thiserror::Error;

/// Result type alias for the sqlpulse runtime
pub type Result<T> = std::result::Result<T, PulseError>;

/// Main error type for the sqlpulse runtime
#[derive(Error, Debug)]
pub enum PulseError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database-layer error (connection, query execution, row scan)
    #[error(transparent)]
    Database(#[from] sqlpulse_rdbc::Error),

    /// A malformed row that the transformer cannot interpret
    #[error("malformed row: {0}")]
    MalformedRow(String),

    /// Publishing sink failure
    #[error("publish error: {0}")]
    Publish(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown requested
    #[error("shutdown requested")]
    Shutdown,
}

impl PulseError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a publish error
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Whether this error only aborts the current query's result set
    /// (the cycle proceeds to the next configured query)
    pub fn is_row_level(&self) -> bool {
        match self {
            Self::Database(e) => e.is_row_level(),
            Self::MalformedRow(_) => true,
            _ => false,
        }
    }

    /// Check if this is a shutdown error
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}
