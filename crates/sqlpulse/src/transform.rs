//! Row-to-event transformation
//!
//! Consumes one scanned row plus the query's type tag and produces
//! either a self-contained event or one field contribution to a
//! caller-held aggregate event (two-columns queries).
//!
//! Delta tracking is suffix-driven and deliberately asymmetric across
//! query types: it applies to single-row queries and to two-columns
//! field names, never to multiple-rows or show-slave-delay queries.
//! See DESIGN.md before "fixing" this.

use chrono::{DateTime, Utc};

use crate::classify::classify;
use crate::config::QueryType;
use crate::delta::{DeltaOutcome, DeltaTracker};
use crate::error::{PulseError, Result};
use crate::event::MetricEvent;
use sqlpulse_rdbc::RawRow;

/// Stateless row transformer; historical state is passed in per call
#[derive(Debug, Clone)]
pub struct RowTransformer {
    db_type: String,
    delta_suffix: String,
    slave_delay_column: String,
}

impl RowTransformer {
    /// Create a transformer for one backend/config
    pub fn new(
        db_type: impl Into<String>,
        delta_suffix: impl Into<String>,
        slave_delay_column: impl Into<String>,
    ) -> Self {
        Self {
            db_type: db_type.into(),
            delta_suffix: delta_suffix.into(),
            slave_delay_column: slave_delay_column.into(),
        }
    }

    /// Create a fresh event carrying only the mandatory fields.
    /// Used by the driver as the accumulator for two-columns queries.
    pub fn empty_event(&self, at: DateTime<Utc>) -> MetricEvent {
        MetricEvent::new(at, &self.db_type)
    }

    /// Build one event from a scanned row.
    ///
    /// Applies per-query-type field derivation:
    /// - show-slave-delay keeps only the configured diagnostic column
    /// - single-row delta-tracks suffix-marked columns
    /// - multiple-rows adds every column as-is (no delta tracking)
    ///
    /// Returns `None` when the row contributed no data field beyond the
    /// mandatory timestamp/type pair, so the caller skips publishing.
    pub fn event_from_row(
        &self,
        row: &RawRow,
        query_type: QueryType,
        at: DateTime<Utc>,
        tracker: &mut DeltaTracker,
    ) -> Option<MetricEvent> {
        let mut event = self.empty_event(at);

        for (name, cell) in row.columns().iter().zip(row.cells()) {
            if query_type == QueryType::SlaveDelay && *name != self.slave_delay_column {
                continue;
            }

            // SQL NULL classifies as an empty string, never a null marker.
            let value = classify(cell.as_deref().unwrap_or(""));

            if query_type == QueryType::SingleRow && name.ends_with(&self.delta_suffix) {
                match tracker.observe(name, value.clone(), at) {
                    DeltaOutcome::FirstSighting => event.insert(name, value),
                    DeltaOutcome::Value(derived) => event.insert(name, derived),
                }
            } else {
                event.insert(name, value);
            }
        }

        (!event.is_empty()).then_some(event)
    }

    /// Fold one two-columns row into the aggregate event: the first
    /// cell names the field, the second carries its value. Delta
    /// tracking applies whenever the field name carries the suffix.
    pub fn append_row(
        &self,
        event: &mut MetricEvent,
        row: &RawRow,
        at: DateTime<Utc>,
        tracker: &mut DeltaTracker,
    ) -> Result<()> {
        if row.len() < 2 {
            return Err(PulseError::MalformedRow(format!(
                "two-columns query returned {} column(s)",
                row.len()
            )));
        }

        let cells = row.cells();
        let field_name = cells[0].as_deref().unwrap_or("").to_string();
        let value = classify(cells[1].as_deref().unwrap_or(""));

        if field_name.ends_with(&self.delta_suffix) {
            match tracker.observe(&field_name, value.clone(), at) {
                DeltaOutcome::FirstSighting => event.insert(field_name, value),
                DeltaOutcome::Value(derived) => event.insert(field_name, derived),
            }
        } else {
            event.insert(field_name, value);
        }

        Ok(())
    }
}
