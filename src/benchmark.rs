//! # Load Driver
//!
//! Turns the parsed configuration into a stream of sends against one
//! [`ProducerSession`].
//!
//! ## Key Components
//!
//! - **BenchmarkConfig**: validated run parameters derived from [`Args`]
//! - **Workload**: pre-generated topics, keys and values cycled through by index
//! - **BenchmarkRunner**: the sequential send loop, from the first send to the
//!   final flush
//!
//! ## Run Lifecycle
//!
//! 1. **Generation**: build the key and value pools before the clock starts
//! 2. **Sending**: message *i* goes to `topics[i % T]` with `keys[i % P]` and
//!    `values[i % P]`, paced by the configured [`TrafficShape`]
//! 3. **Flush**: one bounded drain of buffered messages
//! 4. **Report**: totals from the driver and from the last statistics report
//!
//! A non-retryable send failure aborts the run with an error. The session is
//! still closed on that path, since closing happens when it is dropped.

use crate::{
    broker::BrokerClient,
    cli::{Args, TrafficShapeKind},
    defaults,
    producer::ProducerSession,
    results::BenchmarkReport,
    traffic::{Rate, TrafficShape},
    utils::{format_bytes, random_alphanumeric},
};
use anyhow::{bail, Context, Result};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default number of messages between two progress lines
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Single source of truth for displaying the run configuration.
struct BenchmarkConfigDisplay<'a> {
    config: &'a BenchmarkConfig,
}

impl<'a> std::fmt::Display for BenchmarkConfigDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config;
        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Starting Kafka producer benchmark")?;
        writeln!(
            f,
            "  Topics:             {} ({}_0..{}_{})",
            config.nb_topics,
            config.topic_prefix,
            config.topic_prefix,
            config.nb_topics - 1
        )?;
        writeln!(f, "  Message Count:      {}", config.nb_messages)?;
        writeln!(
            f,
            "  Message Size:       {}",
            format_bytes(config.message_size)
        )?;
        writeln!(
            f,
            "  Keys:               {}",
            if config.use_random_keys {
                "Random UUIDs"
            } else {
                "None"
            }
        )?;
        writeln!(f, "  Pool Size:          {}", config.pool_size)?;
        writeln!(
            f,
            "  Stats Interval:     {:?}",
            config.reporting_interval
        )?;
        let pacing = match config.target_rate {
            Some(rate) => format!("{} msg/s ({})", rate, config.traffic_shape),
            None => "Unbounded".to_string(),
        };
        writeln!(f, "  Pacing:             {}", pacing)?;
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

/// Configuration for a benchmark run
///
/// Built from [`Args`] by [`BenchmarkConfig::from_args`], which applies the
/// derived defaults and rejects combinations the driver cannot run.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Prefix of the generated topic names
    pub topic_prefix: String,

    /// Number of topics, always at least one
    pub nb_topics: usize,

    /// Total number of messages to send
    pub nb_messages: u64,

    /// Size of each message value in bytes
    pub message_size: usize,

    /// Whether messages carry a random UUID key
    pub use_random_keys: bool,

    /// Number of pre-generated keys and values
    pub pool_size: usize,

    /// Reserved grouping factor, logged but not applied
    pub agg_per_topic_nb_messages: usize,

    /// Interval between two client statistics reports
    pub reporting_interval: Duration,

    /// Optional pacing target in messages per second
    pub target_rate: Option<u32>,

    /// Distribution of paced sends
    pub traffic_shape: TrafficShapeKind,
}

impl BenchmarkConfig {
    /// Create a benchmark configuration from CLI arguments
    ///
    /// ## Validation
    /// - At least one topic and a non-empty topic prefix
    /// - A message size of at least one byte
    /// - A non-zero statistics interval
    /// - A non-zero pool size (defaults to 1000 entries per topic)
    /// - A non-zero target rate when one is given
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.nb_topics == 0 {
            bail!("NB_TOPICS must be at least 1");
        }
        if args.message_size == 0 {
            bail!("MESSAGE_SIZE must be at least 1 byte");
        }
        if args.topic_prefix.is_empty() {
            bail!("TOPIC_PREFIX must not be empty");
        }
        if args.reporting_interval == 0 {
            bail!("REPORTING_INTERVAL must be greater than 0ms");
        }
        if args.target_rate == Some(0) {
            bail!("TARGET_RATE must be greater than 0 when set");
        }

        let pool_size = match args.pool_size {
            Some(size) => size,
            None => args
                .nb_topics
                .checked_mul(defaults::POOL_ENTRIES_PER_TOPIC)
                .context("NB_TOPICS is too large to derive a pool size")?,
        };
        if pool_size == 0 {
            bail!("POOL_SIZE must be at least 1");
        }

        if args.agg_per_topic_nb_messages > 1 {
            info!(
                "AGG_PER_TOPIC_NB_MESSAGES={} is reserved and has no effect, messages are sent one at a time",
                args.agg_per_topic_nb_messages
            );
        }

        Ok(Self {
            topic_prefix: args.topic_prefix.clone(),
            nb_topics: args.nb_topics,
            nb_messages: args.nb_messages,
            message_size: args.message_size,
            use_random_keys: args.use_random_keys,
            pool_size,
            agg_per_topic_nb_messages: args.agg_per_topic_nb_messages,
            reporting_interval: Duration::from_millis(args.reporting_interval),
            target_rate: args.target_rate,
            traffic_shape: args.traffic_shape,
        })
    }

    /// Pacing strategy for this run
    pub fn traffic_shape(&self) -> TrafficShape {
        match (self.target_rate, self.traffic_shape) {
            (None, _) => TrafficShape::Unbounded,
            (Some(rate), TrafficShapeKind::Constant) => {
                TrafficShape::constant(Rate::per_second(rate))
            }
            (Some(rate), TrafficShapeKind::Poisson) => {
                TrafficShape::poisson(Rate::per_second(rate))
            }
        }
    }
}

/// Pre-generated message material
///
/// Generated once, before the send loop starts.
#[derive(Debug, Clone)]
pub struct Workload {
    topics: Vec<String>,
    keys: Option<Vec<String>>,
    values: Vec<String>,
}

impl Workload {
    /// Generate the pools for `config` from the thread-local RNG
    pub fn generate(config: &BenchmarkConfig) -> Self {
        Self::generate_with_rng(config, &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(config: &BenchmarkConfig, rng: &mut R) -> Self {
        let topics = (0..config.nb_topics)
            .map(|i| format!("{}_{}", config.topic_prefix, i))
            .collect();
        let keys = config.use_random_keys.then(|| {
            (0..config.pool_size)
                .map(|_| Uuid::new_v4().to_string())
                .collect()
        });
        let values = (0..config.pool_size)
            .map(|_| random_alphanumeric(rng, config.message_size))
            .collect();

        debug!(
            "Generated {} topics and {} pool entries of {} bytes",
            config.nb_topics, config.pool_size, config.message_size
        );
        Self {
            topics,
            keys,
            values,
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn pool_size(&self) -> usize {
        self.values.len()
    }

    /// Topic, optional key and value of the message at `index`
    pub fn message(&self, index: u64) -> (&str, Option<&str>, &str) {
        let topic = &self.topics[(index % self.topics.len() as u64) as usize];
        let slot = (index % self.values.len() as u64) as usize;
        let key = self.keys.as_ref().map(|keys| keys[slot].as_str());
        (topic, key, &self.values[slot])
    }
}

/// Drives one benchmark run over a producer session
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    stop: Arc<AtomicBool>,
    progress_interval: u64,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Share a stop flag; raising it ends the send loop before the next message
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Log a progress line every `interval` sent messages (0 disables it)
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Generate the workload and run it to completion
    pub fn run<C: BrokerClient>(&self, session: ProducerSession<C>) -> Result<BenchmarkReport> {
        let workload = Workload::generate(&self.config);
        self.run_workload(session, &workload)
    }

    /// Send every message of `workload`, flush, and report
    pub fn run_workload<C: BrokerClient>(
        &self,
        session: ProducerSession<C>,
        workload: &Workload,
    ) -> Result<BenchmarkReport> {
        let config_display = BenchmarkConfigDisplay {
            config: &self.config,
        };
        info!("{}", config_display);

        let mut shape = self.config.traffic_shape();
        let start = Instant::now();
        let mut sent: u64 = 0;
        let mut aborted = false;

        for index in 0..self.config.nb_messages {
            if self.stop.load(Ordering::Relaxed) {
                warn!(
                    "Stop requested, ending the run after {} of {} messages",
                    sent, self.config.nb_messages
                );
                aborted = true;
                break;
            }

            let wait = shape.next_wait();
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }

            let (topic, key, value) = workload.message(index);
            session
                .send(topic, key, value)
                .with_context(|| format!("Benchmark aborted after {} messages", sent))?;
            sent += 1;

            if self.progress_interval > 0 && sent % self.progress_interval == 0 {
                info!("Sent {} records", sent);
            }
        }

        let remaining = session.flush();
        if remaining > 0 {
            warn!(
                "{} messages were still in flight after the final flush",
                remaining
            );
        }
        let elapsed = start.elapsed();

        let report = BenchmarkReport::new(
            sent,
            session.last_sample(),
            elapsed,
            session.deliveries(),
            aborted,
        );
        session.close();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{SendRejection, SessionHandlers};
    use crate::error::BrokerError;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Client accepting every message, recording topics and keys
    #[derive(Default)]
    struct RecordingClient {
        sent: Arc<Mutex<Vec<(String, Option<String>)>>>,
        fail_at: Option<usize>,
    }

    impl BrokerClient for RecordingClient {
        fn try_send(
            &self,
            topic: &str,
            key: Option<&[u8]>,
            _value: &[u8],
        ) -> Result<(), SendRejection> {
            let mut sent = self.sent.lock();
            if self.fail_at == Some(sent.len()) {
                return Err(SendRejection::Fatal(BrokerError::Client(
                    "Unknown topic or partition".to_string(),
                )));
            }
            sent.push((
                topic.to_string(),
                key.map(|k| String::from_utf8_lossy(k).into_owned()),
            ));
            Ok(())
        }

        fn poll(&self, _max_wait: Duration) {}

        fn flush(&self, _timeout: Duration) -> Result<(), BrokerError> {
            Ok(())
        }

        fn in_flight_count(&self) -> usize {
            0
        }
    }

    fn config(args: Args) -> BenchmarkConfig {
        BenchmarkConfig::from_args(&args).unwrap()
    }

    #[test]
    fn test_benchmark_config_creation() {
        let config = config(Args {
            nb_topics: 3,
            ..Default::default()
        });

        assert_eq!(config.topic_prefix, "sample");
        assert_eq!(config.nb_messages, 1_000_000);
        assert_eq!(config.message_size, 200);
        assert_eq!(config.pool_size, 3_000);
        assert_eq!(config.reporting_interval, Duration::from_millis(1000));
        assert!(matches!(config.traffic_shape(), TrafficShape::Unbounded));
    }

    #[test]
    fn test_invalid_configurations_are_rejected() {
        let invalid = [
            Args {
                nb_topics: 0,
                ..Default::default()
            },
            Args {
                message_size: 0,
                ..Default::default()
            },
            Args {
                topic_prefix: String::new(),
                ..Default::default()
            },
            Args {
                reporting_interval: 0,
                ..Default::default()
            },
            Args {
                pool_size: Some(0),
                ..Default::default()
            },
            Args {
                target_rate: Some(0),
                ..Default::default()
            },
        ];

        for args in invalid {
            assert!(BenchmarkConfig::from_args(&args).is_err(), "{:?}", args);
        }
    }

    #[test]
    fn test_target_rate_selects_shape() {
        let constant = config(Args {
            target_rate: Some(100),
            ..Default::default()
        });
        assert!(matches!(constant.traffic_shape(), TrafficShape::Constant(_)));

        let poisson = config(Args {
            target_rate: Some(100),
            traffic_shape: TrafficShapeKind::Poisson,
            ..Default::default()
        });
        assert!(matches!(poisson.traffic_shape(), TrafficShape::Poisson(_)));
    }

    #[test]
    fn test_workload_cycles_pools_and_topics() {
        let config = config(Args {
            nb_topics: 2,
            pool_size: Some(3),
            message_size: 16,
            ..Default::default()
        });
        let workload = Workload::generate_with_rng(&config, &mut StdRng::seed_from_u64(1));

        assert_eq!(workload.topics(), &["sample_0", "sample_1"]);
        assert_eq!(workload.pool_size(), 3);

        let (topic0, key0, value0) = workload.message(0);
        let (topic3, key3, value3) = workload.message(3);
        assert_eq!(topic0, "sample_0");
        assert_eq!(topic3, "sample_1");
        assert_eq!(key0, key3);
        assert_eq!(value0, value3);
        assert_eq!(value0.len(), 16);
        assert!(Uuid::parse_str(key0.unwrap()).is_ok());
    }

    #[test]
    fn test_workload_without_keys() {
        let config = config(Args {
            use_random_keys: false,
            pool_size: Some(2),
            ..Default::default()
        });
        let workload = Workload::generate(&config);

        assert_eq!(workload.message(0).1, None);
        assert_eq!(workload.message(1).1, None);
    }

    #[test]
    fn test_run_sends_every_message() {
        let config = config(Args {
            nb_topics: 2,
            nb_messages: 10,
            pool_size: Some(4),
            ..Default::default()
        });
        let client = RecordingClient::default();
        let sent = Arc::clone(&client.sent);
        let session = ProducerSession::new(client, SessionHandlers::new().unwrap());

        let report = BenchmarkRunner::new(config).run(session).unwrap();

        assert_eq!(report.messages_sent, 10);
        assert!(!report.aborted);
        let sent = sent.lock();
        assert_eq!(sent.len(), 10);
        assert!(sent.iter().step_by(2).all(|(t, _)| t == "sample_0"));
        assert!(sent.iter().skip(1).step_by(2).all(|(t, _)| t == "sample_1"));
    }

    #[test]
    fn test_fatal_send_aborts_the_run() {
        let config = config(Args {
            nb_messages: 10,
            pool_size: Some(1),
            ..Default::default()
        });
        let client = RecordingClient {
            fail_at: Some(4),
            ..Default::default()
        };
        let sent = Arc::clone(&client.sent);
        let session = ProducerSession::new(client, SessionHandlers::new().unwrap());

        let err = BenchmarkRunner::new(config).run(session).unwrap_err();

        assert!(err.to_string().contains("after 4 messages"));
        assert_eq!(sent.lock().len(), 4);
    }

    /// Log sink shared with a scoped subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_progress_logged_every_interval() {
        let config = config(Args {
            nb_messages: 10,
            pool_size: Some(2),
            ..Default::default()
        });
        let session =
            ProducerSession::new(RecordingClient::default(), SessionHandlers::new().unwrap());
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let runner = BenchmarkRunner::new(config).with_progress_interval(3);
        let report =
            tracing::subscriber::with_default(subscriber, || runner.run(session)).unwrap();

        assert_eq!(report.messages_sent, 10);
        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        let progress: Vec<&str> = output
            .lines()
            .filter(|line| line.contains(" records"))
            .collect();
        assert_eq!(progress.len(), 3, "{}", output);
        assert!(progress[0].ends_with("Sent 3 records"));
        assert!(progress[1].ends_with("Sent 6 records"));
        assert!(progress[2].ends_with("Sent 9 records"));
    }

    #[test]
    fn test_default_progress_interval() {
        let runner = BenchmarkRunner::new(config(Args::default()));
        assert_eq!(runner.progress_interval, 100_000);
    }

    #[test]
    fn test_stop_flag_ends_run_early() {
        let config = config(Args {
            nb_messages: 1_000,
            pool_size: Some(1),
            ..Default::default()
        });
        let stop = Arc::new(AtomicBool::new(true));
        let client = RecordingClient::default();
        let sent = Arc::clone(&client.sent);
        let session = ProducerSession::new(client, SessionHandlers::new().unwrap());

        let report = BenchmarkRunner::new(config)
            .with_stop_flag(stop)
            .run(session)
            .unwrap();

        assert!(report.aborted);
        assert_eq!(report.messages_sent, 0);
        assert!(sent.lock().is_empty());
    }
}
