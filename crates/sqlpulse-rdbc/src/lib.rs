//! # sqlpulse-rdbc
//!
//! Relational database connectivity for the sqlpulse metric poller.
//!
//! The poller's transformation engine works on raw textual cells, so this
//! crate deliberately exposes a textual row model: a cursor yields ordered
//! column names and `Option<String>` cells (`None` = SQL NULL). Semantic
//! typing happens downstream.
//!
//! ## Feature flags
//!
//! - `postgres` (default) - PostgreSQL support via tokio-postgres

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use connection::{
    factory_for, Connection, ConnectionConfig, ConnectionFactory, Cursor, DatabaseType,
};
pub use error::{Error, ErrorCategory, Result};
pub use mock::{MockDatabase, MockResponse, MockResultSet};
pub use types::RawRow;
