//! Error types shared by the producer session, the broker seam and the
//! statistics aggregator.

use rdkafka::error::KafkaError;
use thiserror::Error;

/// Errors reported by a broker client implementation.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Failure raised by a non-Kafka client (test doubles, alternative transports)
    #[error("Client error: {0}")]
    Client(String),
}

/// Errors returned by [`crate::producer::ProducerSession::send`].
#[derive(Error, Debug)]
pub enum ProduceError {
    #[error("Topic name must not be empty")]
    EmptyTopic,

    #[error("Failed to send message with key {key} to topic '{topic}': {source}")]
    Send {
        topic: String,
        key: String,
        #[source]
        source: BrokerError,
    },
}

/// Errors raised while turning a raw statistics payload into a snapshot.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Malformed statistics payload: {0}")]
    Parse(#[from] serde_json::Error),
}
