//! # Kafka broker client
//!
//! [`BrokerClient`] implementation backed by librdkafka's `BaseProducer`.
//! The producer context wires librdkafka's callbacks into the session:
//!
//! - `stats_raw` hands the JSON statistics report to the [`StatsAggregator`]
//!   untouched, so parsing failures stay inside the aggregator
//! - `delivery` reports each message outcome to the [`DeliveryTracker`],
//!   with the enqueue instant carried in the delivery opaque
//! - `log` and `error` forward librdkafka's own diagnostics to `tracing`
//!
//! [`StatsAggregator`]: crate::stats::StatsAggregator
//! [`DeliveryTracker`]: crate::metrics::DeliveryTracker

use super::{BrokerClient, ClientOptions, SendRejection, SessionHandlers};
use crate::error::BrokerError;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{BaseProducer, BaseRecord, DeliveryResult, Producer, ProducerContext};
use rdkafka::{ClientConfig, ClientContext};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// librdkafka callback context
pub struct BenchContext {
    handlers: SessionHandlers,
    origin: Instant,
}

impl BenchContext {
    fn new(handlers: SessionHandlers) -> Self {
        Self {
            handlers,
            origin: Instant::now(),
        }
    }

    /// Microseconds since the client was opened, stored as the delivery opaque
    fn enqueue_mark(&self) -> usize {
        self.origin.elapsed().as_micros() as usize
    }

    fn latency_since(&self, mark: usize) -> Option<Duration> {
        let now = self.origin.elapsed();
        now.checked_sub(Duration::from_micros(mark as u64))
    }
}

impl ClientContext for BenchContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => error!(target: "librdkafka", "{} {}", fac, log_message),
            RDKafkaLogLevel::Warning => warn!(target: "librdkafka", "{} {}", fac, log_message),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
                info!(target: "librdkafka", "{} {}", fac, log_message)
            }
            RDKafkaLogLevel::Debug => debug!(target: "librdkafka", "{} {}", fac, log_message),
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        error!(target: "librdkafka", "{}: {}", error, reason);
    }

    fn stats_raw(&self, statistics: &[u8]) {
        self.handlers.stats.on_snapshot(statistics);
    }
}

impl ProducerContext for BenchContext {
    type DeliveryOpaque = usize;

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, enqueued_at: Self::DeliveryOpaque) {
        match delivery_result {
            Ok(_) => self
                .handlers
                .deliveries
                .record_success(self.latency_since(enqueued_at)),
            Err((err, _)) => self.handlers.deliveries.record_failure(&err.to_string()),
        }
    }
}

/// Kafka producer handle owned by a [`crate::producer::ProducerSession`]
pub struct KafkaClient {
    producer: BaseProducer<BenchContext>,
}

impl KafkaClient {
    /// Create the underlying producer with `options` and register `handlers`
    pub fn open(options: &ClientOptions, handlers: SessionHandlers) -> Result<Self, BrokerError> {
        let mut config = ClientConfig::new();
        for (key, value) in options {
            config.set(key, value);
        }
        debug!("Creating Kafka producer with options: {:?}", options);

        let producer: BaseProducer<BenchContext> =
            config.create_with_context(BenchContext::new(handlers))?;
        Ok(Self { producer })
    }
}

impl BrokerClient for KafkaClient {
    fn try_send(&self, topic: &str, key: Option<&[u8]>, value: &[u8]) -> Result<(), SendRejection> {
        let mark = self.producer.context().enqueue_mark();
        let mut record: BaseRecord<'_, [u8], [u8], usize> =
            BaseRecord::with_opaque_to(topic, mark).payload(value);
        if let Some(key) = key {
            record = record.key(key);
        }

        match self.producer.send(record) {
            Ok(()) => Ok(()),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Err(SendRejection::QueueFull)
            }
            Err((err, _)) => Err(SendRejection::Fatal(BrokerError::Kafka(err))),
        }
    }

    fn poll(&self, max_wait: Duration) {
        self.producer.poll(max_wait);
    }

    fn flush(&self, timeout: Duration) -> Result<(), BrokerError> {
        Ok(self.producer.flush(timeout)?)
    }

    fn in_flight_count(&self) -> usize {
        self.producer.in_flight_count().max(0) as usize
    }

    fn close(&mut self) {
        let remaining = self.in_flight_count();
        if remaining > 0 {
            warn!(
                "Closing Kafka producer with {} messages still in flight",
                remaining
            );
        } else {
            debug!("Closing Kafka producer");
        }
    }
}
