//! Error types for sqlpulse-rdbc
//!
//! Provides granular error classification so the polling runtime can tell
//! cycle-aborting failures (connection, query execution) apart from
//! row-level failures that only abort the current result set.

use std::fmt;
use thiserror::Error;

/// Result type for sqlpulse-rdbc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection-related errors (retriable on the next polling tick)
    Connection,
    /// Query execution errors (malformed SQL, permission denied)
    Query,
    /// Row iteration/scan errors (abort only the current result set)
    RowScan,
    /// Authentication failure
    Authentication,
    /// Configuration error
    Configuration,
    /// Timeout errors (retriable)
    Timeout,
    /// Unknown/other errors
    Other,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout)
    }
}

/// Main error type for sqlpulse-rdbc
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failed
    #[error("connection error: {message}")]
    Connection {
        /// Human-readable failure description
        message: String,
        /// Underlying driver error, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution failed
    #[error("query error: {message}")]
    Query {
        /// Human-readable failure description
        message: String,
        /// SQL text that failed, when available
        sql: Option<String>,
        /// Underlying driver error, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Row iteration or scan failed mid-result-set
    #[error("row scan error: {message}")]
    RowScan {
        /// Human-readable failure description
        message: String,
    },

    /// Authentication failed
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human-readable failure description
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable failure description
        message: String,
    },

    /// Operation timed out
    #[error("timeout: {message}")]
    Timeout {
        /// Human-readable failure description
        message: String,
    },

    /// Unsupported backend or operation
    #[error("unsupported: {message}")]
    Unsupported {
        /// Human-readable failure description
        message: String,
    },

    /// Internal error
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable failure description
        message: String,
    },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Query { .. } => ErrorCategory::Query,
            Self::RowScan { .. } => ErrorCategory::RowScan,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Unsupported { .. } | Self::Internal { .. } => ErrorCategory::Other,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Whether this error only aborts the current result set
    #[inline]
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::RowScan { .. })
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error with the failing SQL
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a row scan error
    pub fn row_scan(message: impl Into<String>) -> Self {
        Self::RowScan {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Query => write!(f, "query"),
            Self::RowScan => write!(f, "row_scan"),
            Self::Authentication => write!(f, "authentication"),
            Self::Configuration => write!(f, "configuration"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}
