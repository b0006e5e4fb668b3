//! Polling runtime
//!
//! Owns the scheduler loop: one timer tick, one polling cycle, strictly
//! sequential. A fresh connection is opened per cycle and closed after
//! it, so a dropped database link heals on the next tick as long as the
//! cycle that noticed it is allowed to fail the run (the supervisor
//! decides whether to restart).
//!
//! At most one cycle is ever in flight: a cycle that overruns the
//! polling period causes the missed ticks to be skipped, never run
//! concurrently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::PulseConfig;
use crate::driver::{CycleStats, QueryDriver};
use crate::error::Result;
use crate::sink::{EventSink, StdoutSink};
use sqlpulse_rdbc::{factory_for, ConnectionFactory};

/// The polling loop: timer, per-cycle connection lifecycle, counters
pub struct PulseRunner {
    config: PulseConfig,
    factory: Arc<dyn ConnectionFactory>,
    sink: Arc<dyn EventSink>,
    driver: QueryDriver,
    cycles_completed: AtomicU64,
    events_published: AtomicU64,
}

impl PulseRunner {
    /// Build a runner with an explicit backend factory and sink
    pub fn new(
        config: PulseConfig,
        factory: Arc<dyn ConnectionFactory>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let driver = QueryDriver::new(&config);
        Self {
            config,
            factory,
            sink,
            driver,
            cycles_completed: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
        }
    }

    /// Build a runner wired to the compiled-in backend and stdout sink
    pub fn from_config(config: PulseConfig) -> Result<Self> {
        let factory = factory_for(config.db_type())?;
        Ok(Self::new(config, factory, Arc::new(StdoutSink::new())))
    }

    /// Polling cycles completed so far
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Events accepted by the sink so far
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Run polling cycles until shutdown is signalled.
    ///
    /// A cycle-aborting error stops the run and propagates; the
    /// supervisor decides whether to restart the process.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        self.log_startup();

        let mut ticker = tokio::time::interval(self.config.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!(
                        cycles = self.cycles_completed(),
                        events = self.events_published(),
                        "shutdown requested, stopping poller"
                    );
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let stats = self.run_once().await?;
                    debug!(?stats, "polling cycle complete");
                }
            }
        }
    }

    /// Run exactly one polling cycle on a fresh connection
    pub async fn run_once(&mut self) -> Result<CycleStats> {
        let conn_config = self.config.database.connection_config();
        let conn = self.factory.connect(&conn_config).await?;

        let result = self.driver.run_cycle(conn.as_ref(), self.sink.as_ref()).await;
        if let Err(e) = conn.close().await {
            warn!(error = %e, "error closing connection");
        }

        let stats = result?;
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.events_published
            .fetch_add(stats.events_published, Ordering::Relaxed);
        Ok(stats)
    }

    fn log_startup(&self) {
        let db = &self.config.database;
        if db.port.is_none() {
            info!(
                port = db.db_type.default_port(),
                "database port wasn't selected, proceeding with the default"
            );
        }
        info!(
            dbtype = %db.db_type,
            hostname = %db.hostname,
            period_ms = self.config.period_ms,
            queries = self.config.queries.len(),
            "starting poller"
        );
        for (index, query) in self.config.queries.iter().enumerate() {
            debug!(index, query_type = %query.query_type, sql = %query.sql, "configured query");
        }
    }
}
