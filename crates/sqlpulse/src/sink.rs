//! Event publishing sinks
//!
//! The driver publishes every completed event through an [`EventSink`].
//! `publish` returns whether the sink accepted the event; a declined
//! event is logged and counted, not treated as a cycle failure.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{PulseError, Result};
use crate::event::MetricEvent;

/// Destination for completed metric events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one event; `Ok(false)` means the sink declined it
    async fn publish(&self, event: &MetricEvent) -> Result<bool>;
}

/// Writes one JSON object per line to standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Create a stdout sink
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn publish(&self, event: &MetricEvent) -> Result<bool> {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| PulseError::publish(format!("event serialization failed: {e}")))?;
        line.push(b'\n');

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&line).await?;
        stdout.flush().await?;
        debug!(bytes = line.len(), "event written to stdout");
        Ok(true)
    }
}

/// Test sink collecting events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<MetricEvent>>,
    decline: std::sync::atomic::AtomicBool,
}

impl MemorySink {
    /// Create an empty sink that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes return `Ok(false)`
    pub fn set_decline(&self, decline: bool) {
        self.decline
            .store(decline, std::sync::atomic::Ordering::Relaxed);
    }

    /// Events accepted so far, in publish order
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of events accepted so far
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no event was accepted yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(&self, event: &MetricEvent) -> Result<bool> {
        if self.decline.load(std::sync::atomic::Ordering::Relaxed) {
            return Ok(false);
        }
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event() -> MetricEvent {
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap();
        let mut event = MetricEvent::new(at, "postgres");
        event.insert("v", crate::classify::ColumnValue::Integer(1));
        event
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.publish(&event()).await.unwrap());
        assert!(sink.publish(&event()).await.unwrap());
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_decline() {
        let sink = MemorySink::new();
        sink.set_decline(true);
        assert!(!sink.publish(&event()).await.unwrap());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_stdout_sink_accepts() {
        let sink = StdoutSink::new();
        assert!(sink.publish(&event()).await.unwrap());
    }
}
