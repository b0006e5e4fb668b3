//! Metric events
//!
//! An event is an ordered field mapping, always opening with the
//! `@timestamp` and `type` fields, followed by the metric fields derived
//! from a result row (or, for two-columns queries, from many rows).
//! An event that never gained a data field is empty and must not be
//! published.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::classify::ColumnValue;

/// Field name carrying the event timestamp
pub const TIMESTAMP_FIELD: &str = "@timestamp";
/// Field name carrying the database backend tag
pub const TYPE_FIELD: &str = "type";

const MANDATORY_FIELDS: usize = 2;

/// One structured metric event, ready for a publishing sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricEvent {
    fields: IndexMap<String, ColumnValue>,
}

impl MetricEvent {
    /// Create an event carrying only the mandatory timestamp/type fields
    pub fn new(at: DateTime<Utc>, db_type: &str) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(
            TIMESTAMP_FIELD.to_string(),
            ColumnValue::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        fields.insert(TYPE_FIELD.to_string(), ColumnValue::String(db_type.to_string()));
        Self { fields }
    }

    /// Add or replace a data field
    pub fn insert(&mut self, name: impl Into<String>, value: ColumnValue) {
        self.fields.insert(name.into(), value);
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.fields.get(name)
    }

    /// Number of data fields beyond the mandatory pair
    pub fn data_fields(&self) -> usize {
        self.fields.len().saturating_sub(MANDATORY_FIELDS)
    }

    /// Whether the event carries no data beyond timestamp/type.
    /// Empty events are never published.
    pub fn is_empty(&self) -> bool {
        self.fields.len() <= MANDATORY_FIELDS
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to a JSON value, preserving field order
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
