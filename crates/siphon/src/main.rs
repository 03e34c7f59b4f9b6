//! Siphon - HTTP-to-storage ingestion
//!
//! # Usage
//!
//! ```bash
//! # Run an upsert job
//! siphon --config jobs/coinbase.toml
//!
//! # With verbose logging
//! siphon --config jobs/coinbase.toml --log-level debug
//! ```

use anyhow::Result;
use clap::Parser;
use siphon_config::Config;
use siphon_transport::{CancellationToken, Upsert};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Siphon - run a declarative HTTP-to-storage upsert job
#[derive(Parser, Debug)]
#[command(name = "siphon")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the job configuration file
    #[arg(short, long, default_value = "siphon.toml")]
    config: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = Config::from_file(&cli.config)?;
    tracing::info!(
        config = %cli.config.display(),
        requests = config.requests.len(),
        backends = config.dns_list.len(),
        "job loaded"
    );

    // Ctrl-C aborts in-flight work and rolls back open transactions.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, aborting job");
            signal_cancel.cancel();
        }
    });

    Upsert::new(&config)
        .with_cancellation(cancel)
        .run()
        .await?;

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
