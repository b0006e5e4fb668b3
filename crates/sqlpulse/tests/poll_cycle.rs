//! End-to-end polling cycles against a scripted database.
//!
//! Covers the full path: YAML config -> driver -> transformer ->
//! delta tracker -> sink, across several cycles and query types.

use std::sync::Arc;
use std::time::Duration;

use sqlpulse::{ColumnValue, MemorySink, PulseConfig, PulseRunner, QueryDriver};
use sqlpulse_rdbc::{ConnectionFactory, MockDatabase, MockResponse, MockResultSet};

const CONFIG: &str = r#"
period_ms: 200
database:
  dbtype: postgres
  hostname: db.internal
  username: pulse
  password: hunter2
  database: metrics
  sslmode: disable
queries:
  - sql: "status"
    type: single-row
  - sql: "databases"
    type: multiple-rows
  - sql: "settings"
    type: two-columns
delta_suffix: "__DELTA"
"#;

fn cell(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn scripted_db() -> MockDatabase {
    let db = MockDatabase::new();
    db.enqueue_rows(
        "status",
        &["active_connections", "version"],
        vec![vec![cell("12"), cell("16.3")]],
    );
    db.enqueue_rows(
        "databases",
        &["datname", "size_mb"],
        vec![
            vec![cell("metrics"), cell("512")],
            vec![cell("app"), cell("2048")],
        ],
    );
    db.enqueue_rows(
        "settings",
        &["name", "setting"],
        vec![
            vec![cell("max_connections"), cell("100")],
            vec![cell("shared_buffers"), cell("16384")],
        ],
    );
    db
}

#[tokio::test]
async fn full_cycle_produces_all_event_shapes() {
    let db = scripted_db();
    let config = PulseConfig::from_yaml(CONFIG).unwrap();
    let sink = MemorySink::new();
    let mut driver = QueryDriver::new(&config);

    let conn = db
        .connect(&config.database.connection_config())
        .await
        .unwrap();
    let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

    // single-row event, two multiple-rows events, one two-columns aggregate
    assert_eq!(stats.events_published, 4);
    assert_eq!(stats.row_errors, 0);

    let events = sink.events();
    assert_eq!(events.len(), 4);

    // Every event carries the mandatory pair plus data fields.
    for event in &events {
        assert!(event.get("@timestamp").is_some());
        assert_eq!(event.get("type"), Some(&ColumnValue::String("postgres".into())));
        assert!(!event.is_empty());
    }

    // single-row: classified columns from the first row
    assert_eq!(
        events[0].get("active_connections"),
        Some(&ColumnValue::Integer(12))
    );
    assert_eq!(events[0].get("version"), Some(&ColumnValue::Float(16.3)));

    // multiple-rows: one event per row
    assert_eq!(events[1].get("datname"), Some(&ColumnValue::String("metrics".into())));
    assert_eq!(events[2].get("size_mb"), Some(&ColumnValue::Integer(2048)));

    // two-columns: rows folded into one aggregate
    assert_eq!(events[3].get("max_connections"), Some(&ColumnValue::Integer(100)));
    assert_eq!(events[3].get("shared_buffers"), Some(&ColumnValue::Integer(16384)));

    // Every cursor was released.
    assert_eq!(db.cursors_opened(), 3);
    assert_eq!(db.cursors_closed(), 3);
}

#[tokio::test]
async fn delta_columns_publish_raw_then_rate() {
    let db = MockDatabase::new();
    // Counter moves by 600 between the two scripted cycles.
    db.enqueue_rows("status", &["tx_count__DELTA"], vec![vec![cell("400")]]);
    db.enqueue_rows("status", &["tx_count__DELTA"], vec![vec![cell("1000")]]);

    let yaml = CONFIG.replace(
        r#"  - sql: "databases"
    type: multiple-rows
  - sql: "settings"
    type: two-columns
"#,
        "",
    );
    let config = PulseConfig::from_yaml(&yaml).unwrap();
    let sink = MemorySink::new();
    let mut driver = QueryDriver::new(&config);

    let conn = db
        .connect(&config.database.connection_config())
        .await
        .unwrap();

    driver.run_cycle(conn.as_ref(), &sink).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].get("tx_count__DELTA"),
        Some(&ColumnValue::Integer(400))
    );
    // 600 over just above a second: a per-second rate well below the
    // raw counter but above zero.
    match events[1].get("tx_count__DELTA") {
        Some(ColumnValue::Integer(rate)) => {
            assert!(*rate > 0 && *rate < 600, "unexpected rate {rate}")
        }
        other => panic!("expected integer rate, got {other:?}"),
    }
}

#[tokio::test]
async fn row_failure_in_one_query_spares_the_others() {
    let db = MockDatabase::new();
    db.enqueue(
        "databases",
        MockResponse::Result(MockResultSet {
            columns: vec!["datname".into()],
            rows: vec![vec![cell("metrics")], vec![cell("app")]],
            fail_scan_at: Some(1),
        }),
    );
    db.enqueue_rows(
        "status",
        &["active_connections", "version"],
        vec![vec![cell("12"), cell("16.3")]],
    );
    db.enqueue_rows(
        "settings",
        &["name", "setting"],
        vec![vec![cell("max_connections"), cell("100")]],
    );

    let config = PulseConfig::from_yaml(CONFIG).unwrap();
    let sink = MemorySink::new();
    let mut driver = QueryDriver::new(&config);

    let conn = db
        .connect(&config.database.connection_config())
        .await
        .unwrap();
    let stats = driver.run_cycle(conn.as_ref(), &sink).await.unwrap();

    // status event, the first databases row, and the settings aggregate
    assert_eq!(stats.events_published, 3);
    assert_eq!(stats.row_errors, 1);
    assert_eq!(db.cursors_opened(), 3);
    assert_eq!(db.cursors_closed(), 3);
}

#[tokio::test]
async fn runner_polls_until_shutdown() {
    let db = scripted_db();
    let config = PulseConfig::from_yaml(CONFIG).unwrap();
    let sink = Arc::new(MemorySink::new());

    let mut runner = PulseRunner::new(config, Arc::new(db), sink.clone());
    let (tx, rx) = tokio::sync::broadcast::channel(1);

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = tx.send(());
    });

    runner.run(rx).await.unwrap();
    stopper.await.unwrap();

    assert!(runner.cycles_completed() >= 2);
    // 4 events per cycle, every cycle fully published.
    assert_eq!(runner.events_published(), 4 * runner.cycles_completed());
    assert_eq!(sink.len() as u64, runner.events_published());
}
