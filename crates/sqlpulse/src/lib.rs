//! # sqlpulse
//!
//! SQL-polling metric collector: runs a configured list of queries
//! against a relational database on a fixed period and turns each
//! result set into structured metric events.
//!
//! The interesting part is the row-to-event transformation engine:
//!
//! - [`classify`] infers each raw textual cell's semantic type
//!   (integer, float or string) with deterministic precedence
//! - [`delta`] keeps per-column historical state across polling cycles
//!   and derives per-second rates for counter-like columns
//! - [`transform`] assembles rows into one of several event shapes
//!   depending on the query's declared type
//! - [`driver`] runs the query list each cycle with per-query-type
//!   control flow and two-tier error handling
//! - [`runner`] owns the scheduler loop, connection lifecycle and
//!   shutdown
//!
//! Database connectivity lives in the `sqlpulse-rdbc` crate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod classify;
pub mod config;
pub mod delta;
pub mod driver;
pub mod error;
pub mod event;
pub mod runner;
pub mod sink;
pub mod transform;
pub mod types;

pub use classify::{classify, ColumnValue};
pub use config::{PulseConfig, QueryConfig, QueryType};
pub use delta::{DeltaOutcome, DeltaTracker};
pub use driver::{CycleStats, QueryDriver};
pub use error::{PulseError, Result};
pub use event::MetricEvent;
pub use runner::PulseRunner;
pub use sink::{EventSink, MemorySink, StdoutSink};
pub use transform::RowTransformer;
pub use types::SensitiveString;
