//! In-memory mock backend for exercising the polling runtime in tests.
//!
//! Results are scripted per SQL text. Each `execute` consumes the next
//! scripted response for that query; the final response is sticky, so a
//! query scripted once returns the same result set on every later cycle
//! (successive responses model counters that move between cycles).
//!
//! The database also counts opened/closed cursors and connections, which
//! lets tests assert that every cursor is released on every exit path.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory, Cursor, DatabaseType};
use crate::error::{Error, Result};

/// One scripted result set
#[derive(Debug, Clone, Default)]
pub struct MockResultSet {
    /// Ordered column names
    pub columns: Vec<String>,
    /// Raw textual rows
    pub rows: Vec<Vec<Option<String>>>,
    /// When set, scanning the row at this index fails
    pub fail_scan_at: Option<usize>,
}

/// Scripted response to an `execute` call
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this result set
    Result(MockResultSet),
    /// Fail the execute call itself
    ExecuteError(String),
}

#[derive(Default)]
struct MockState {
    scripts: HashMap<String, VecDeque<MockResponse>>,
}

/// Shared scripted database; also a [`ConnectionFactory`]
#[derive(Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<MockState>>,
    cursors_opened: Arc<AtomicUsize>,
    cursors_closed: Arc<AtomicUsize>,
}

impl MockDatabase {
    /// Create an empty mock database
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a query text
    pub fn enqueue(&self, sql: &str, response: MockResponse) {
        let mut state = self.lock();
        state
            .scripts
            .entry(sql.to_string())
            .or_default()
            .push_back(response);
    }

    /// Script a plain result set for a query text
    pub fn enqueue_rows(&self, sql: &str, columns: &[&str], rows: Vec<Vec<Option<String>>>) {
        self.enqueue(
            sql,
            MockResponse::Result(MockResultSet {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
                fail_scan_at: None,
            }),
        );
    }

    /// Number of cursors handed out so far
    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::Relaxed)
    }

    /// Number of cursors explicitly closed so far
    pub fn cursors_closed(&self) -> usize {
        self.cursors_closed.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_response(&self, sql: &str) -> Option<MockResponse> {
        let mut state = self.lock();
        let queue = state.scripts.get_mut(sql)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ConnectionFactory for MockDatabase {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        Ok(Box::new(MockConnection { db: self.clone() }))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }
}

struct MockConnection {
    db: MockDatabase,
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        match self.db.take_response(sql) {
            Some(MockResponse::Result(result)) => {
                self.db.cursors_opened.fetch_add(1, Ordering::Relaxed);
                Ok(Box::new(MockCursor {
                    result,
                    position: None,
                    closed: self.db.cursors_closed.clone(),
                }))
            }
            Some(MockResponse::ExecuteError(message)) => {
                Err(Error::query_with_sql(message, sql))
            }
            None => Err(Error::query_with_sql("no scripted result", sql)),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct MockCursor {
    result: MockResultSet,
    position: Option<usize>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Cursor for MockCursor {
    fn column_names(&self) -> &[String] {
        &self.result.columns
    }

    async fn next(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.result.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.result.rows.len());
            Ok(false)
        }
    }

    fn scan(&self) -> Result<Vec<Option<String>>> {
        let idx = self
            .position
            .filter(|&p| p < self.result.rows.len())
            .ok_or_else(|| Error::row_scan("scan called with no current row"))?;
        if self.result.fail_scan_at == Some(idx) {
            return Err(Error::row_scan(format!("scripted scan failure at row {idx}")));
        }
        Ok(self.result.rows[idx].clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
