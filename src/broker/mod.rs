use crate::error::BrokerError;
use crate::metrics::DeliveryTracker;
use crate::stats::StatsAggregator;
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub mod kafka;

pub use kafka::KafkaClient;

/// Client configuration passed through to the broker client (`bootstrap.servers`, `acks`, ...)
pub type ClientOptions = BTreeMap<String, String>;

/// Why the client refused to enqueue a message
#[derive(Debug)]
pub enum SendRejection {
    /// The local send queue is full; retry once the client made progress
    QueueFull,
    /// Any other send failure; never retried
    Fatal(BrokerError),
}

/// Handlers registered with the client when the session opens
///
/// Both are invoked from the client's own background thread: the statistics
/// handler once per interval tick, the delivery handler once per message.
#[derive(Clone)]
pub struct SessionHandlers {
    pub stats: Arc<StatsAggregator>,
    pub deliveries: Arc<DeliveryTracker>,
}

impl SessionHandlers {
    pub fn new() -> Result<Self> {
        Ok(Self {
            stats: Arc::new(StatsAggregator::new()),
            deliveries: Arc::new(DeliveryTracker::new()?),
        })
    }
}

/// Producer-side interface of a pub-sub broker client
///
/// Implementations buffer messages locally and deliver them asynchronously,
/// reporting outcomes through the [`SessionHandlers`] they were opened with.
pub trait BrokerClient {
    /// Enqueue a message into the client's local buffer without blocking
    fn try_send(&self, topic: &str, key: Option<&[u8]>, value: &[u8]) -> Result<(), SendRejection>;

    /// Serve pending callbacks, waiting at most `max_wait` (zero means non-blocking)
    fn poll(&self, max_wait: Duration);

    /// Wait up to `timeout` for buffered and in-flight messages to be delivered
    fn flush(&self, timeout: Duration) -> Result<(), BrokerError>;

    /// Messages buffered or awaiting a delivery report
    fn in_flight_count(&self) -> usize;

    /// Release client resources. Called exactly once, when the session ends.
    fn close(&mut self) {}
}
