use anyhow::Result;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::error;

/// Delivery outcome totals with enqueue-to-delivery latency percentiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub delivered: u64,
    pub failed: u64,
    pub p50_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

/// Delivery-report handler registered with the broker client.
///
/// Invoked once per message from the client's background thread. Failed
/// deliveries are logged and counted, never retried: the message has already
/// left local buffering.
pub struct DeliveryTracker {
    delivered: AtomicU64,
    failed: AtomicU64,
    latency_us: Mutex<Histogram<u64>>,
}

impl DeliveryTracker {
    /// Create a new tracker
    pub fn new() -> Result<Self> {
        // 3 significant figures, auto-resizing
        let histogram = Histogram::<u64>::new(3)?;

        Ok(Self {
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            latency_us: Mutex::new(histogram),
        })
    }

    /// Record a message acknowledged by the broker
    pub fn record_success(&self, latency: Option<Duration>) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = latency {
            let micros = latency.as_micros().min(u64::MAX as u128) as u64;
            self.latency_us.lock().saturating_record(micros.max(1));
        }
    }

    /// Record a message the broker (or the client) failed to deliver
    pub fn record_failure(&self, reason: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        error!("Failed to deliver message: {}", reason);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Current totals and latency percentiles
    pub fn summary(&self) -> DeliverySummary {
        let histogram = self.latency_us.lock();
        let (p50_us, p99_us, max_us) = if histogram.len() == 0 {
            (None, None, None)
        } else {
            (
                Some(histogram.value_at_quantile(0.5)),
                Some(histogram.value_at_quantile(0.99)),
                Some(histogram.max()),
            )
        };

        DeliverySummary {
            delivered: self.delivered(),
            failed: self.failed(),
            p50_us,
            p99_us,
            max_us,
        }
    }
}
