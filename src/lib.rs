//! # Kafka Producer Benchmark Library
//!
//! A load-generating producer for Apache Kafka. It pushes a configurable volume
//! of messages into one or more topics as fast as the client's local buffering
//! allows, and turns the client's periodic statistics reports into
//! instantaneous throughput and latency figures.
//!
//! ## Architecture Overview
//!
//! - `broker`: producer-side client abstraction and its librdkafka implementation
//! - `producer`: backpressure-aware send over an exclusively owned client
//! - `stats`: statistics report parsing and rate derivation
//! - `metrics`: delivery outcome counters and latency histogram
//! - `benchmark`: run configuration, workload generation and the send loop
//! - `traffic`: optional pacing between sends
//! - `results`: final run report
//! - `cli`: command-line and environment configuration
//! - `logging`: timestamped, level-colored log lines
//! - `utils`: formatting and payload helpers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use kafka_producer_bench::broker::{KafkaClient, SessionHandlers};
//! use kafka_producer_bench::cli::client_options_from_env;
//! use kafka_producer_bench::{Args, BenchmarkConfig, BenchmarkRunner, ProducerSession};
//!
//! # fn main() -> anyhow::Result<()> {
//! let args = Args {
//!     nb_messages: 10_000,
//!     nb_topics: 2,
//!     ..Default::default()
//! };
//! let config = BenchmarkConfig::from_args(&args)?;
//!
//! let options = client_options_from_env(std::env::vars(), args.reporting_interval);
//! let handlers = SessionHandlers::new()?;
//! let client = KafkaClient::open(&options, handlers.clone())?;
//! let session = ProducerSession::new(client, handlers);
//!
//! let report = BenchmarkRunner::new(config).run(session)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

/// Run configuration, workload generation and the sequential send loop
pub mod benchmark;

/// Pub-sub client abstraction and the Kafka implementation
pub mod broker;

/// Command-line interface and environment configuration
///
/// Every workload option doubles as an environment variable, and `KAFKA_*`
/// variables are forwarded to the client as configuration options.
pub mod cli;

pub mod error;

pub mod logging;

/// Delivery counters and enqueue-to-acknowledgement latency
pub mod metrics;

/// Backpressure-aware producer session
pub mod producer;

pub mod results;

/// Statistics report parsing and instantaneous rate derivation
pub mod stats;

pub mod traffic;

pub mod utils;

pub use benchmark::{BenchmarkConfig, BenchmarkRunner, Workload};
pub use cli::Args;
pub use producer::ProducerSession;
pub use results::BenchmarkReport;
pub use stats::{derive_rates, DerivedRates, RawStatsSnapshot, StatsAggregator, StatsCheckpoint};

/// The current version of the benchmark
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Prefix of the generated topic names
    pub const TOPIC_PREFIX: &str = "sample";

    /// Default number of topics
    pub const NB_TOPICS: usize = 1;

    /// Default number of messages to send
    pub const NB_MESSAGES: u64 = 1_000_000;

    /// Default message value size in bytes
    pub const MESSAGE_SIZE: usize = 200;

    /// Default interval between two client statistics reports, in milliseconds
    pub const REPORTING_INTERVAL_MS: u64 = 1_000;

    /// Pool entries generated per topic when no pool size is given
    pub const POOL_ENTRIES_PER_TOPIC: usize = 1_000;

    /// Acknowledgement level requested from the brokers
    pub const ACKS: &str = "all";

    pub const BOOTSTRAP_SERVERS: &str = "localhost:9092";
}
