//! # Backpressure Producer
//!
//! [`ProducerSession`] owns one broker client for the length of a benchmark run
//! and exposes a blocking-with-retry [`send`](ProducerSession::send):
//!
//! 1. **Enqueue**: hand the message to the client's local buffer
//! 2. **Queue full**: serve callbacks for up to [`QUEUE_FULL_BACKOFF`] so the
//!    client can drain, then retry the same message, indefinitely
//! 3. **Fatal**: log the failing key and return the error, without retrying
//! 4. **Progress tick**: a non-blocking poll before returning, so delivery and
//!    statistics callbacks fire even under a sustained submission rate
//!
//! The client is closed exactly once when the session is dropped, whichever
//! way the driving loop exits.

use crate::broker::{BrokerClient, SendRejection, SessionHandlers};
use crate::error::ProduceError;
use crate::metrics::DeliverySummary;
use crate::stats::StatsCheckpoint;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Time spent serving callbacks before retrying a message rejected with a full queue
pub const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound for the final drain of buffered messages
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// One logical producer session over an exclusively owned broker client
pub struct ProducerSession<C: BrokerClient> {
    client: C,
    handlers: SessionHandlers,
}

impl<C: BrokerClient> ProducerSession<C> {
    /// Wrap a client opened with `handlers`
    pub fn new(client: C, handlers: SessionHandlers) -> Self {
        Self { client, handlers }
    }

    /// Send one message, waiting for room in the local buffer if needed
    pub fn send<K, V>(&self, topic: &str, key: Option<&K>, value: &V) -> Result<(), ProduceError>
    where
        K: AsRef<[u8]> + ?Sized,
        V: AsRef<[u8]> + ?Sized,
    {
        if topic.is_empty() {
            return Err(ProduceError::EmptyTopic);
        }
        let key = key.map(|k| k.as_ref());
        let value = value.as_ref();

        let result = loop {
            match self.client.try_send(topic, key, value) {
                Ok(()) => break Ok(()),
                Err(SendRejection::QueueFull) => {
                    debug!(
                        "Local queue is full, waiting {:?} before retrying",
                        QUEUE_FULL_BACKOFF
                    );
                    self.client.poll(QUEUE_FULL_BACKOFF);
                }
                Err(SendRejection::Fatal(source)) => {
                    let key = display_key(key);
                    error!("Failed to send message with key {}: {}", key, source);
                    break Err(ProduceError::Send {
                        topic: topic.to_string(),
                        key,
                        source,
                    });
                }
            }
        };

        self.client.poll(Duration::ZERO);
        result
    }

    /// Wait up to [`FLUSH_TIMEOUT`] for outstanding messages.
    ///
    /// Best effort: returns the number of messages still in flight afterwards.
    pub fn flush(&self) -> usize {
        if let Err(e) = self.client.flush(FLUSH_TIMEOUT) {
            warn!("Flush did not complete within {:?}: {}", FLUSH_TIMEOUT, e);
        }
        self.client.in_flight_count()
    }

    /// Previous-sample triple of the statistics aggregator
    pub fn last_sample(&self) -> StatsCheckpoint {
        self.handlers.stats.last_sample()
    }

    /// Delivery totals reported so far
    pub fn deliveries(&self) -> DeliverySummary {
        self.handlers.deliveries.summary()
    }

    /// End the session, releasing the client
    pub fn close(self) {}
}

impl<C: BrokerClient> Drop for ProducerSession<C> {
    fn drop(&mut self) {
        self.client.close();
    }
}

fn display_key(key: Option<&[u8]>) -> String {
    match key {
        Some(key) => String::from_utf8_lossy(key).into_owned(),
        None => "<none>".to_string(),
    }
}
