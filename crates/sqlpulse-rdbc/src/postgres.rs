//! PostgreSQL backend via tokio-postgres
//!
//! Uses the simple-query protocol on purpose: it returns every cell as
//! text, which is exactly the raw cell model the transformation engine
//! classifies. The result set is buffered into the cursor, so cursor
//! iteration itself never touches the wire.

use async_trait::async_trait;
use tokio_postgres::{NoTls, SimpleQueryMessage};
use tracing::debug;

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory, Cursor, DatabaseType};
use crate::error::{Error, Result};

/// Factory producing PostgreSQL connections
pub struct PgConnectionFactory;

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let conn_str = config.connection_string();
        let (client, connection) = tokio_postgres::connect(&conn_str, NoTls)
            .await
            .map_err(|e| Error::connection_with_source("postgres connect failed", e))?;

        // The connection future must be polled for the client to make progress.
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "postgres connection task ended");
            }
        });

        Ok(Box::new(PgConnection { client, handle }))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }
}

struct PgConnection {
    client: tokio_postgres::Client,
    handle: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| Error::Query {
                message: e.to_string(),
                sql: Some(sql.to_string()),
                source: Some(Box::new(e)),
            })?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();

        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(desc) => {
                    columns = desc.iter().map(|c| c.name().to_string()).collect();
                }
                SimpleQueryMessage::Row(row) => {
                    if columns.is_empty() {
                        columns = row
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                    let cells = (0..row.len())
                        .map(|i| row.get(i).map(str::to_string))
                        .collect();
                    rows.push(cells);
                }
                _ => {}
            }
        }

        debug!(rows = rows.len(), cols = columns.len(), "query buffered");
        Ok(Box::new(PgCursor {
            columns,
            rows,
            position: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.handle.abort();
        Ok(())
    }
}

/// Buffered cursor over a simple-query result set
struct PgCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    /// Index of the current row; `None` before the first `next()`
    position: Option<usize>,
}

#[async_trait]
impl Cursor for PgCursor {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.rows.len());
            Ok(false)
        }
    }

    fn scan(&self) -> Result<Vec<Option<String>>> {
        let idx = self
            .position
            .filter(|&p| p < self.rows.len())
            .ok_or_else(|| Error::row_scan("scan called with no current row"))?;
        Ok(self.rows[idx].clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.rows.clear();
        self.position = None;
        Ok(())
    }
}
