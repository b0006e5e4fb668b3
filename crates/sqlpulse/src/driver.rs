//! Query execution driver
//!
//! Runs the configured query list once per polling cycle, strictly in
//! order, feeding each result row to the transformer and completed
//! events to the sink. Error tiers follow the runtime contract: a
//! query-execution failure aborts the whole cycle, a row-level failure
//! only abandons the current query's remaining rows. Cursors are closed
//! on every exit path before the next query starts.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{PulseConfig, QueryConfig, QueryType};
use crate::delta::DeltaTracker;
use crate::error::{PulseError, Result};
use crate::event::MetricEvent;
use crate::sink::EventSink;
use crate::transform::RowTransformer;
use sqlpulse_rdbc::{Connection, Cursor, RawRow};

/// Counters for one completed polling cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    /// Events the sink accepted
    pub events_published: u64,
    /// Empty events never offered to the sink
    pub events_skipped: u64,
    /// Events the sink declined
    pub events_rejected: u64,
    /// Queries abandoned mid-result-set on a row error
    pub row_errors: u64,
}

/// Sequential query executor owning the cross-cycle delta state
pub struct QueryDriver {
    queries: Vec<QueryConfig>,
    transformer: RowTransformer,
    tracker: DeltaTracker,
}

impl QueryDriver {
    /// Build a driver from the loaded configuration
    pub fn new(config: &PulseConfig) -> Self {
        Self {
            queries: config.queries.clone(),
            transformer: RowTransformer::new(
                config.db_type().as_str(),
                config.delta_suffix.clone(),
                config.slave_delay_column.clone(),
            ),
            tracker: DeltaTracker::new(),
        }
    }

    /// Run every configured query once, in order.
    ///
    /// Returns `Err` only for cycle-aborting failures (query execution,
    /// sink infrastructure); row-level failures are logged, counted and
    /// the cycle moves on.
    pub async fn run_cycle(
        &mut self,
        conn: &dyn Connection,
        sink: &dyn EventSink,
    ) -> Result<CycleStats> {
        let mut stats = CycleStats::default();
        let transformer = &self.transformer;
        let tracker = &mut self.tracker;

        for (index, query) in self.queries.iter().enumerate() {
            let at = Utc::now();
            debug!(index, query_type = %query.query_type, sql = %query.sql, "running query");

            let mut cursor = conn.execute(&query.sql).await.map_err(PulseError::from)?;
            let outcome =
                run_query(transformer, tracker, query, cursor.as_mut(), sink, at, &mut stats)
                    .await;
            if let Err(e) = cursor.close().await {
                warn!(index, error = %e, "error closing cursor");
            }

            match outcome {
                Ok(()) => {}
                Err(e) if e.is_row_level() => {
                    stats.row_errors += 1;
                    warn!(index, error = %e, "row error, skipping to next query");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }

    /// Number of delta keys tracked so far
    pub fn tracked_columns(&self) -> usize {
        self.tracker.len()
    }
}

/// Drain one query's cursor according to its declared type.
async fn run_query(
    transformer: &RowTransformer,
    tracker: &mut DeltaTracker,
    query: &QueryConfig,
    cursor: &mut dyn Cursor,
    sink: &dyn EventSink,
    at: DateTime<Utc>,
    stats: &mut CycleStats,
) -> Result<()> {
    match query.query_type {
        QueryType::SingleRow | QueryType::SlaveDelay => {
            // Only the first row matters; any further rows are not read.
            if cursor.next().await? {
                let row = scan_row(cursor)?;
                match transformer.event_from_row(&row, query.query_type, at, tracker) {
                    Some(event) => offer(sink, &event, query.query_type, stats).await?,
                    None => {
                        stats.events_skipped += 1;
                        debug!(query_type = %query.query_type, "empty event, not published");
                    }
                }
            } else {
                info!(query_type = %query.query_type, "no results for query");
            }
            Ok(())
        }

        QueryType::MultipleRows => {
            let mut results = 0usize;
            while cursor.next().await? {
                results += 1;
                let row = scan_row(cursor)?;
                match transformer.event_from_row(&row, query.query_type, at, tracker) {
                    Some(event) => offer(sink, &event, query.query_type, stats).await?,
                    None => stats.events_skipped += 1,
                }
            }
            if results == 0 {
                info!(query_type = %query.query_type, "no results for query");
            }
            Ok(())
        }

        QueryType::TwoColumns => {
            let mut event = transformer.empty_event(at);
            let mut row_error = None;

            loop {
                match cursor.next().await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        row_error = Some(PulseError::from(e));
                        break;
                    }
                }
                let appended = scan_row(cursor)
                    .and_then(|row| transformer.append_row(&mut event, &row, at, tracker));
                if let Err(e) = appended {
                    row_error = Some(e);
                    break;
                }
            }

            // A partial aggregate still publishes; only a fieldless one
            // is dropped.
            if event.is_empty() {
                stats.events_skipped += 1;
                debug!("two-columns aggregate stayed empty, not published");
            } else {
                offer(sink, &event, query.query_type, stats).await?;
            }

            match row_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }
}

/// Scan the cursor's current row into an owned raw row.
fn scan_row(cursor: &dyn Cursor) -> Result<RawRow> {
    let columns: Arc<[String]> = cursor.column_names().iter().cloned().collect();
    let cells = cursor.scan()?;
    Ok(RawRow::new(columns, cells))
}

/// Offer one completed event to the sink.
async fn offer(
    sink: &dyn EventSink,
    event: &MetricEvent,
    query_type: QueryType,
    stats: &mut CycleStats,
) -> Result<()> {
    if sink.publish(event).await? {
        stats.events_published += 1;
        info!(%query_type, "event sent");
    } else {
        stats.events_rejected += 1;
        warn!(%query_type, "sink declined event");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ColumnValue;
    use crate::config::PulseConfig;
    use crate::sink::MemorySink;
    use sqlpulse_rdbc::{ConnectionFactory, MockDatabase, MockResponse, MockResultSet};

    fn cell(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn config(queries: &[(&str, &str)]) -> PulseConfig {
        let entries: String = queries
            .iter()
            .map(|(sql, query_type)| format!("  - sql: \"{sql}\"\n    type: {query_type}\n"))
            .collect();
        let yaml = format!(
            "database:\n  dbtype: postgres\n  username: pulse\n  database: metrics\n  sslmode: disable\nqueries:\n{entries}"
        );
        PulseConfig::from_yaml(&yaml).unwrap()
    }

    async fn connect(db: &MockDatabase, config: &PulseConfig) -> Box<dyn Connection> {
        db.connect(&config.database.connection_config()).await.unwrap()
    }

    #[tokio::test]
    async fn test_single_row_reads_first_row_only() {
        let db = MockDatabase::new();
        db.enqueue_rows(
            "q1",
            &["connections"],
            vec![vec![cell("5")], vec![cell("999")]],
        );

        let config = config(&[("q1", "single-row")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

        assert_eq!(stats.events_published, 1);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get("connections"), Some(&ColumnValue::Integer(5)));
        assert_eq!(db.cursors_opened(), db.cursors_closed());
    }

    #[tokio::test]
    async fn test_multiple_rows_emits_one_event_per_row() {
        let db = MockDatabase::new();
        db.enqueue_rows(
            "q1",
            &["db", "size"],
            vec![
                vec![cell("metrics"), cell("100")],
                vec![cell("app"), cell("250")],
            ],
        );

        let config = config(&[("q1", "multiple-rows")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();
        assert_eq!(stats.events_published, 2);
    }

    #[tokio::test]
    async fn test_two_columns_empty_result_not_published() {
        let db = MockDatabase::new();
        db.enqueue_rows("q1", &["k", "v"], vec![]);

        let config = config(&[("q1", "two-columns")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.events_skipped, 1);
        assert!(sink.is_empty());
        assert_eq!(db.cursors_opened(), db.cursors_closed());
    }

    #[tokio::test]
    async fn test_execute_error_aborts_cycle() {
        let db = MockDatabase::new();
        db.enqueue("q1", MockResponse::ExecuteError("connection lost".into()));
        db.enqueue_rows("q2", &["v"], vec![vec![cell("1")]]);

        let config = config(&[("q1", "single-row"), ("q2", "single-row")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        let err = driver.run_cycle(conn.as_ref(), &sink).await.unwrap_err();
        assert!(!err.is_row_level());
        // q2 never ran
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_row_error_skips_to_next_query() {
        let db = MockDatabase::new();
        db.enqueue(
            "q1",
            MockResponse::Result(MockResultSet {
                columns: vec!["db".into()],
                rows: vec![vec![cell("a")], vec![cell("b")]],
                fail_scan_at: Some(1),
            }),
        );
        db.enqueue_rows("q2", &["v"], vec![vec![cell("7")]]);

        let config = config(&[("q1", "multiple-rows"), ("q2", "single-row")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

        // First row of q1 published, then the scan failure, then q2.
        assert_eq!(stats.events_published, 2);
        assert_eq!(stats.row_errors, 1);
        assert_eq!(db.cursors_opened(), 2);
        assert_eq!(db.cursors_closed(), 2);
    }

    #[tokio::test]
    async fn test_two_columns_partial_aggregate_still_published() {
        let db = MockDatabase::new();
        db.enqueue(
            "q1",
            MockResponse::Result(MockResultSet {
                columns: vec!["k".into(), "v".into()],
                rows: vec![
                    vec![cell("up"), cell("1")],
                    vec![cell("threads"), cell("8")],
                ],
                fail_scan_at: Some(1),
            }),
        );

        let config = config(&[("q1", "two-columns")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.row_errors, 1);
        let events = sink.events();
        assert_eq!(events[0].get("up"), Some(&ColumnValue::Integer(1)));
        assert!(events[0].get("threads").is_none());
    }

    #[tokio::test]
    async fn test_declined_event_counted_not_fatal() {
        let db = MockDatabase::new();
        db.enqueue_rows("q1", &["v"], vec![vec![cell("1")]]);

        let config = config(&[("q1", "single-row")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();
        sink.set_decline(true);

        let conn = connect(&db, &config).await;
        let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();
        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.events_rejected, 1);
    }

    #[tokio::test]
    async fn test_delta_rate_across_cycles() {
        let db = MockDatabase::new();
        db.enqueue_rows("q1", &["bytes__DELTA"], vec![vec![cell("1000")]]);
        db.enqueue_rows("q1", &["bytes__DELTA"], vec![vec![cell("2000")]]);

        let config = config(&[("q1", "single-row")]);
        let mut driver = QueryDriver::new(&config);
        let sink = MemorySink::new();

        let conn = connect(&db, &config).await;
        driver.run_cycle(conn.as_ref(), &sink).await.unwrap();
        assert_eq!(driver.tracked_columns(), 1);

        // Real elapsed time so the second observation derives a rate.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        driver.run_cycle(conn.as_ref(), &sink).await.unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 2);
        // First sighting publishes the raw counter.
        assert_eq!(
            events[0].get("bytes__DELTA"),
            Some(&ColumnValue::Integer(1000))
        );
        // 1000 counted over slightly more than a second: a per-second
        // rate strictly between zero and the raw counter value.
        match events[1].get("bytes__DELTA") {
            Some(ColumnValue::Integer(rate)) => assert!(*rate > 0 && *rate < 1000),
            other => panic!("expected integer rate, got {other:?}"),
        }
    }
}
