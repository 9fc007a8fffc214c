//! # Statistics Aggregator
//!
//! The broker client emits a JSON statistics report on a fixed interval
//! (`statistics.interval.ms`). Every counter in that report is cumulative, so
//! instantaneous rates are derived by differencing the current report against
//! the previous one kept in a [`StatsCheckpoint`].
//!
//! ## Derived values
//!
//! - **Sent rate**: messages transmitted per second over the last window
//! - **Request rate**: ProduceRequests issued per second over the last window
//! - **Batch size**: mean of the per-topic average batch sizes
//! - **Queue time**: mean of the per-broker internal queue latency, in ms
//! - **Request latency**: mean of the per-broker round-trip time, in ms
//! - **Records per request**: sent rate divided by request rate
//!
//! When no time has elapsed between two reports (first report, duplicate
//! timestamps) the raw cumulative value is reported instead of a rate.

use crate::error::StatsError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// librdkafka reports timestamps in microseconds.
const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// librdkafka reports latency windows in microseconds; rates are logged in ms.
const MICROS_PER_MILLI: f64 = 1_000.0;

/// Name of the per-broker request counter tracking produce requests.
const PRODUCE_REQUEST_KEY: &str = "Produce";

/// Rolling window summary as reported by the client (`min`, `max`, `avg`, ...).
///
/// Only the average is consumed.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatsWindow {
    pub avg: i64,
}

/// Per-topic section of a statistics report.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicStats {
    pub batchsize: StatsWindow,
}

/// Per-broker-connection section of a statistics report.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerStats {
    /// Time messages spend in the internal producer queue (µs)
    pub int_latency: StatsWindow,
    /// Broker request round-trip time (µs)
    pub rtt: StatsWindow,
    /// Cumulative request counters keyed by request type
    #[serde(default)]
    pub req: HashMap<String, i64>,
}

impl BrokerStats {
    /// Cumulative number of ProduceRequests sent over this connection.
    pub fn produce_requests(&self) -> i64 {
        self.req.get(PRODUCE_REQUEST_KEY).copied().unwrap_or(0)
    }
}

/// Raw periodic statistics report, reduced to the fields the aggregator needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStatsSnapshot {
    /// Cumulative number of messages transmitted to brokers
    pub txmsgs: i64,
    /// Client clock at report time (µs)
    pub ts: i64,
    pub topics: HashMap<String, TopicStats>,
    pub brokers: HashMap<String, BrokerStats>,
}

impl RawStatsSnapshot {
    /// Parse a JSON statistics report.
    pub fn from_slice(raw: &[u8]) -> Result<Self, StatsError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Report timestamp in seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.ts as f64 / MICROS_PER_SECOND
    }

    /// Mean of the per-topic average batch sizes, 0 when no topic reported.
    pub fn batch_size_avg(&self) -> f64 {
        mean(self.topics.values().map(|t| t.batchsize.avg as f64))
    }

    /// Mean internal queue latency across brokers, in milliseconds.
    pub fn queue_latency_avg_ms(&self) -> f64 {
        mean(self.brokers.values().map(|b| b.int_latency.avg as f64)) / MICROS_PER_MILLI
    }

    /// Mean request round-trip time across brokers, in milliseconds.
    pub fn request_latency_avg_ms(&self) -> f64 {
        mean(self.brokers.values().map(|b| b.rtt.avg as f64)) / MICROS_PER_MILLI
    }

    /// Mean of the cumulative per-broker ProduceRequest counters.
    pub fn request_count(&self) -> f64 {
        mean(self.brokers.values().map(|b| b.produce_requests() as f64))
    }
}

/// Arithmetic mean, 0 for an empty input.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// The previous-sample triple.
///
/// The three fields always describe the same report and are replaced as a
/// whole, never individually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsCheckpoint {
    pub last_sample_timestamp_secs: f64,
    pub last_total_messages: f64,
    pub last_request_count: f64,
}

/// Instantaneous rates computed from two consecutive reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedRates {
    pub messages_per_sec: f64,
    pub requests_per_sec: f64,
    pub batch_size_avg: f64,
    pub queue_time_avg_ms: f64,
    pub request_latency_avg_ms: f64,
    pub records_per_request: f64,
}

impl fmt::Display for DerivedRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sent rate = {}/sec, duration spent in queue = {}ms, batch size = {}, \
request rate = {}/sec, request latency avg = {}ms, records per ProduceRequest = {}",
            self.messages_per_sec,
            self.queue_time_avg_ms,
            self.batch_size_avg,
            self.requests_per_sec,
            self.request_latency_avg_ms,
            self.records_per_request
        )
    }
}

/// Derive rates from `snapshot` and advance `previous` to it.
pub fn derive_rates(snapshot: &RawStatsSnapshot, previous: &mut StatsCheckpoint) -> DerivedRates {
    let total_messages = snapshot.txmsgs as f64;
    let timestamp = snapshot.timestamp_secs();
    let elapsed = (timestamp - previous.last_sample_timestamp_secs).max(0.0);

    let request_count = snapshot.request_count();

    let requests_per_sec = if elapsed > 0.0 {
        (request_count - previous.last_request_count) / elapsed
    } else {
        request_count
    };
    let messages_per_sec = if elapsed > 0.0 {
        (total_messages - previous.last_total_messages) / elapsed
    } else {
        total_messages
    };

    if requests_per_sec < 0.0 {
        warn!(
            "ProduceRequest counter went backwards ({} -> {}), reporting 0 records per request",
            previous.last_request_count, request_count
        );
    }
    let records_per_request = if messages_per_sec > 0.0 && requests_per_sec > 0.0 {
        messages_per_sec / requests_per_sec
    } else {
        0.0
    };

    *previous = StatsCheckpoint {
        last_sample_timestamp_secs: timestamp,
        last_total_messages: total_messages,
        last_request_count: request_count,
    };

    DerivedRates {
        messages_per_sec,
        requests_per_sec,
        batch_size_avg: snapshot.batch_size_avg(),
        queue_time_avg_ms: snapshot.queue_latency_avg_ms(),
        request_latency_avg_ms: snapshot.request_latency_avg_ms(),
        records_per_request,
    }
}

/// Statistics handler registered with the broker client.
///
/// The client invokes it from its own background thread, at most one report
/// at a time; the checkpoint mutex also lets the driver read the final totals.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    checkpoint: Mutex<StatsCheckpoint>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one raw JSON report.
    ///
    /// A malformed report is logged and dropped; it never reaches the caller.
    pub fn on_snapshot(&self, raw: &[u8]) -> Option<DerivedRates> {
        match RawStatsSnapshot::from_slice(raw) {
            Ok(snapshot) => Some(self.on_stats(&snapshot)),
            Err(e) => {
                warn!("Something went wrong while processing statistics: {}", e);
                None
            }
        }
    }

    /// Handle one parsed report and log the derived rates.
    pub fn on_stats(&self, snapshot: &RawStatsSnapshot) -> DerivedRates {
        let rates = {
            let mut checkpoint = self.checkpoint.lock();
            derive_rates(snapshot, &mut checkpoint)
        };
        debug!(
            txmsgs = snapshot.txmsgs,
            ts = snapshot.ts,
            brokers = snapshot.brokers.len(),
            topics = snapshot.topics.len(),
            "Processed statistics report"
        );
        info!("{}", rates);
        rates
    }

    /// Copy of the previous-sample triple.
    pub fn last_sample(&self) -> StatsCheckpoint {
        *self.checkpoint.lock()
    }
}
