//! Delta tracking
//!
//! Counter-like columns (names carrying the configured delta suffix) are
//! not published raw: the tracker remembers the last observation per
//! column name and derives a per-second rate of change when a newer one
//! arrives. State is memory-resident and lives for the whole process.
//!
//! The key is the bare column name, so identically named columns from
//! different queries share tracked state. That collision matches the
//! system this replaces and is kept on purpose (see DESIGN.md).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::trace;

use crate::classify::ColumnValue;

/// Last observation for one tracked column
#[derive(Debug, Clone)]
struct Observation {
    value: ColumnValue,
    at: DateTime<Utc>,
}

/// Outcome of observing a delta column
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOutcome {
    /// No usable prior observation: the caller emits the raw value.
    ///
    /// Returned on the first sighting of a key and on degenerate elapsed
    /// time (zero or negative) between observations.
    FirstSighting,
    /// Derived value to emit in place of the raw one
    Value(ColumnValue),
}

/// Per-column historical state across polling cycles.
///
/// Owned by the query execution driver and passed by reference into each
/// transformation call; never module-global.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    state: HashMap<String, Observation>,
}

impl DeltaTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked columns
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether no columns are tracked yet
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Record an observation for `key` and derive its rate of change.
    ///
    /// Rates are clamped to zero when the counter decreased (service
    /// restarts must not produce negative spikes). String values carry
    /// no rate concept: they pass through unchanged, though the state
    /// still advances. The new observation is always stored.
    pub fn observe(
        &mut self,
        key: &str,
        value: ColumnValue,
        at: DateTime<Utc>,
    ) -> DeltaOutcome {
        let outcome = match self.state.get(key) {
            None => DeltaOutcome::FirstSighting,
            Some(prior) => Self::derive(prior, &value, at),
        };
        trace!(key, kind = value.kind(), ?outcome, "delta observation");
        self.state.insert(
            key.to_string(),
            Observation { value, at },
        );
        outcome
    }

    fn derive(prior: &Observation, new: &ColumnValue, at: DateTime<Utc>) -> DeltaOutcome {
        match new {
            ColumnValue::Integer(new_val) => {
                let Some(elapsed) = elapsed_seconds(prior.at, at) else {
                    return DeltaOutcome::FirstSighting;
                };
                // A mismatched prior kind reads as zero, same as a reset.
                let old_val = match prior.value {
                    ColumnValue::Integer(n) => n,
                    _ => 0,
                };
                let rate = if *new_val > old_val {
                    // Ties at .5 round away from zero.
                    (((new_val - old_val) as f64) / elapsed).round() as i64
                } else {
                    0
                };
                DeltaOutcome::Value(ColumnValue::Integer(rate))
            }
            ColumnValue::Float(new_val) => {
                let Some(elapsed) = elapsed_seconds(prior.at, at) else {
                    return DeltaOutcome::FirstSighting;
                };
                let old_val = match prior.value {
                    ColumnValue::Float(x) => x,
                    _ => 0.0,
                };
                let rate = if *new_val > old_val {
                    (new_val - old_val) / elapsed
                } else {
                    0.0
                };
                DeltaOutcome::Value(ColumnValue::Float(rate))
            }
            ColumnValue::String(s) => DeltaOutcome::Value(ColumnValue::String(s.clone())),
        }
    }
}

/// Seconds between two observations; `None` when zero or negative
/// (two observations in the same instant carry no rate information).
fn elapsed_seconds(last: DateTime<Utc>, now: DateTime<Utc>) -> Option<f64> {
    let seconds = (now - last).num_milliseconds() as f64 / 1000.0;
    (seconds > 0.0).then_some(seconds)
}
