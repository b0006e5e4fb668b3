//! sqlpulse - SQL-polling metric collector
//!
//! Periodically runs a configured list of SQL queries against a
//! relational database and publishes each result set as structured
//! metric events (one JSON object per line on stdout).
//!
//! # Usage
//!
//! ```bash
//! # Run the poller
//! sqlpulse -c sqlpulse.yaml
//!
//! # Validate configuration
//! sqlpulse -c sqlpulse.yaml validate
//!
//! # Check database connectivity
//! sqlpulse -c sqlpulse.yaml check
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sqlpulse::{PulseConfig, PulseRunner};
use sqlpulse_rdbc::factory_for;

#[derive(Parser)]
#[command(name = "sqlpulse")]
#[command(version, about = "SQL-polling metric collector")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sqlpulse.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the poller (default)
    Run,
    /// Validate configuration file
    Validate,
    /// Check database connectivity
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PulseConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Validate => validate_config(config),
        Commands::Check => check_connectivity(config).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn run(config: PulseConfig) -> Result<()> {
    info!("Starting sqlpulse");

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (Ctrl+C)");
        let _ = shutdown_tx.send(());
    });

    let mut runner = PulseRunner::from_config(config)?;
    runner.run(shutdown_rx).await?;

    info!(
        "Stopped after {} cycle(s), {} event(s) published",
        runner.cycles_completed(),
        runner.events_published()
    );
    Ok(())
}

fn validate_config(config: PulseConfig) -> Result<()> {
    println!("✓ Configuration valid!\n");

    let db = &config.database;
    println!("Database:");
    println!("  Type: {}", db.db_type);
    println!("  Host: {}:{}", db.hostname, db.connection_config().port());
    println!("  User: {}", db.username);
    if let Some(database) = &db.database {
        println!("  Database: {}", database);
    }
    println!();

    println!("Polling:");
    println!("  Period: {}ms", config.period_ms);
    println!("  Delta suffix: {}", config.delta_suffix);
    println!("  Slave delay column: {}", config.slave_delay_column);
    println!();

    println!("Queries ({}):", config.queries.len());
    for (index, query) in config.queries.iter().enumerate() {
        println!("  {}. [{}] {}", index + 1, query.query_type, query.sql);
    }

    Ok(())
}

async fn check_connectivity(config: PulseConfig) -> Result<()> {
    println!("Running connectivity check...\n");

    let conn_config = config.database.connection_config();
    print!(
        "Database {} ({}:{})... ",
        config.db_type(),
        config.database.hostname,
        conn_config.port()
    );

    let factory = factory_for(config.db_type())?;
    match factory.connect(&conn_config).await {
        Ok(conn) => {
            let mut cursor = conn.execute("SELECT 1").await.context("test query failed")?;
            cursor.next().await?;
            cursor.close().await?;
            conn.close().await?;
            println!("✓ connected");
            Ok(())
        }
        Err(e) => {
            println!("✗ failed: {}", e);
            Err(e.into())
        }
    }
}
