//! # Kafka Producer Benchmark - Main Entry Point
//!
//! 1. **Initialize logging**: timestamped lines, filtered by `RUST_LOG` (info by default)
//! 2. **Parse configuration**: command-line flags and environment variables
//! 3. **Open the session**: Kafka client options from `KAFKA_*` variables
//! 4. **Run**: the blocking send loop runs on a dedicated thread while the
//!    runtime watches for Ctrl-C, which stops the loop before the next message
//! 5. **Report**: the final summary line

use anyhow::{Context, Result};
use clap::Parser;
use kafka_producer_bench::{
    benchmark::{BenchmarkConfig, BenchmarkRunner},
    broker::{KafkaClient, SessionHandlers},
    cli::{client_options_from_env, Args},
    logging::TimestampedFormatter,
    producer::ProducerSession,
    VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(TimestampedFormatter)
        .init();

    info!("Starting Kafka Producer Benchmark v{}", VERSION);
    debug!("Configuration: {:?}", args);

    let config = BenchmarkConfig::from_args(&args)?;
    let options = client_options_from_env(std::env::vars(), args.reporting_interval);

    let handlers = SessionHandlers::new()?;
    let client = KafkaClient::open(&options, handlers.clone())
        .context("Failed to create the Kafka producer")?;
    let session = ProducerSession::new(client, handlers);

    let stop = Arc::new(AtomicBool::new(false));
    let runner = BenchmarkRunner::new(config).with_stop_flag(Arc::clone(&stop));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current message");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let report = tokio::task::spawn_blocking(move || runner.run(session))
        .await
        .context("Benchmark thread panicked")??;

    for line in report.to_string().lines() {
        info!("{}", line);
    }
    debug!("Report: {}", serde_json::to_string(&report)?);
    Ok(())
}
