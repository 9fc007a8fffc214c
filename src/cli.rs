use crate::broker::ClientOptions;
use crate::defaults;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables passed through to the Kafka client
pub const CLIENT_ENV_PREFIX: &str = "KAFKA_";

/// Kafka Producer Benchmark - measures producer throughput and latency against a live cluster
///
/// Every option can also be set through the environment variable named in its
/// help text. Variables prefixed with `KAFKA_` are forwarded to the Kafka
/// client (`KAFKA_BATCH_SIZE=65536` becomes `batch.size=65536`).
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Prefix of the generated topic names (`<prefix>_<index>`)
    #[clap(long, env = "TOPIC_PREFIX", default_value = defaults::TOPIC_PREFIX, help_heading = "Workload")]
    pub topic_prefix: String,

    /// Number of topics messages are spread across, round-robin
    #[clap(long, env = "NB_TOPICS", default_value_t = defaults::NB_TOPICS, help_heading = "Workload")]
    pub nb_topics: usize,

    /// Total number of messages to send
    #[clap(short = 'n', long, env = "NB_MESSAGES", default_value_t = defaults::NB_MESSAGES, help_heading = "Workload")]
    pub nb_messages: u64,

    /// Size of each generated message value in bytes
    #[clap(short = 's', long, env = "MESSAGE_SIZE", default_value_t = defaults::MESSAGE_SIZE, help_heading = "Workload")]
    pub message_size: usize,

    /// Attach a random UUID key to every message
    #[clap(long, env = "USE_RANDOM_KEYS", default_value_t = true, action = clap::ArgAction::Set, help_heading = "Workload")]
    pub use_random_keys: bool,

    /// Number of pre-generated keys and values cycled through (default: 1000 per topic)
    #[clap(long, env = "POOL_SIZE", help_heading = "Workload")]
    pub pool_size: Option<usize>,

    /// Messages grouped per topic before a bulk send (reserved, not applied)
    #[clap(long, env = "AGG_PER_TOPIC_NB_MESSAGES", default_value_t = 1, help_heading = "Workload")]
    pub agg_per_topic_nb_messages: usize,

    /// Milliseconds between two client statistics reports
    #[clap(long, env = "REPORTING_INTERVAL", default_value_t = defaults::REPORTING_INTERVAL_MS, help_heading = "Reporting")]
    pub reporting_interval: u64,

    /// Pace sends to this many messages per second (default: unbounded)
    #[clap(long, env = "TARGET_RATE", help_heading = "Pacing")]
    pub target_rate: Option<u32>,

    /// How paced sends are spread over each second
    #[clap(long, env = "TRAFFIC_SHAPE", value_enum, default_value_t = TrafficShapeKind::Constant, help_heading = "Pacing")]
    pub traffic_shape: TrafficShapeKind,

    /// Verbose output (debug logging, including queue-full waits)
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            topic_prefix: defaults::TOPIC_PREFIX.to_string(),
            nb_topics: defaults::NB_TOPICS,
            nb_messages: defaults::NB_MESSAGES,
            message_size: defaults::MESSAGE_SIZE,
            use_random_keys: true,
            pool_size: None,
            agg_per_topic_nb_messages: 1,
            reporting_interval: defaults::REPORTING_INTERVAL_MS,
            target_rate: None,
            traffic_shape: TrafficShapeKind::Constant,
            verbose: false,
        }
    }
}

/// Distribution of paced sends
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum TrafficShapeKind {
    /// Evenly spaced sends, at most the target rate in any one-second window
    #[clap(name = "constant")]
    Constant,

    /// Poisson arrivals averaging the target rate
    #[clap(name = "poisson")]
    Poisson,
}

impl std::fmt::Display for TrafficShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficShapeKind::Constant => write!(f, "constant"),
            TrafficShapeKind::Poisson => write!(f, "poisson"),
        }
    }
}

/// Build the Kafka client options from environment variables
///
/// `KAFKA_`-prefixed variables are normalized into client option names
/// (prefix stripped, lowercased, `_` replaced by `.`). Defaults are applied
/// only for options left unset: `acks`, `bootstrap.servers` and
/// `statistics.interval.ms` (from `reporting_interval_ms`).
pub fn client_options_from_env<I>(vars: I, reporting_interval_ms: u64) -> ClientOptions
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut options: ClientOptions = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let option = name.strip_prefix(CLIENT_ENV_PREFIX)?;
            if option.is_empty() {
                return None;
            }
            Some((option.to_lowercase().replace('_', "."), value))
        })
        .collect();

    options
        .entry("acks".to_string())
        .or_insert_with(|| defaults::ACKS.to_string());
    options
        .entry("bootstrap.servers".to_string())
        .or_insert_with(|| defaults::BOOTSTRAP_SERVERS.to_string());
    options
        .entry("statistics.interval.ms".to_string())
        .or_insert_with(|| reporting_interval_ms.to_string());
    options
}
