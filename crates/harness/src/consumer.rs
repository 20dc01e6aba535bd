//! Record consumption and validation.
//!
//! [`RecordStream`] is the polling seam over the broker consumer;
//! [`KafkaRecordStream`] implements it with an rdkafka `BaseConsumer`
//! that joins a freshly generated consumer group each time, so every
//! validation starts from its own committed-offset state and reads
//! from the earliest retained record. [`poll_for_valid_message`] is
//! the single place records are judged: error-flagged records are
//! rejected without ever touching the decoder.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::Message;
use uuid::Uuid;

use forwarder_logdata::LogFrame;

use crate::config::{BrokerSettings, ConsumerSettings};
use crate::error::HarnessError;

/// One record as observed off the wire, before any validation.
#[derive(Debug, Clone, Default)]
pub struct ConsumedRecord {
    /// Record payload, if the record carried one.
    pub payload: Option<Vec<u8>>,
    /// Broker-side error flag attached to the record, if any.
    pub error: Option<String>,
}

impl ConsumedRecord {
    /// A well-formed record carrying `payload`.
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
            error: None,
        }
    }

    /// An error-flagged record.
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Bounded poll for the next record on a subscribed stream.
pub trait RecordStream: Send + Sync {
    /// Poll for up to `timeout`, returning the next record if one
    /// arrived. Broker-side errors surface as error-flagged records,
    /// not as `Err`; only harness-internal failures do.
    fn poll_record(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<ConsumedRecord>, HarnessError>> + Send;
}

/// Poll once and validate the outcome.
///
/// The three failure modes are kept distinct: no record at all within
/// `timeout` is [`HarnessError::NoRecord`], an error-flagged record is
/// [`HarnessError::RecordError`] (its payload is never decoded), and a
/// malformed payload is [`HarnessError::Schema`].
///
/// # Errors
///
/// See above; a well-formed record decodes into a [`LogFrame`].
pub async fn poll_for_valid_message<S>(
    stream: &S,
    timeout: Duration,
) -> Result<LogFrame, HarnessError>
where
    S: RecordStream,
{
    let record = stream
        .poll_record(timeout)
        .await?
        .ok_or(HarnessError::NoRecord {
            timeout_secs: timeout.as_secs(),
        })?;

    if let Some(error) = record.error {
        return Err(HarnessError::RecordError(error));
    }
    let payload = record
        .payload
        .ok_or_else(|| HarnessError::RecordError("record had no payload".to_owned()))?;

    Ok(LogFrame::decode(&payload)?)
}

/// Production record stream over an rdkafka `BaseConsumer`.
pub struct KafkaRecordStream {
    consumer: Arc<BaseConsumer>,
    group_id: String,
}

impl KafkaRecordStream {
    /// Create a consumer in a brand-new group and subscribe to `topic`.
    ///
    /// The group id is generated from a v4 UUID so concurrent or
    /// repeated validations never share committed offsets; the offset
    /// reset policy comes from the consumer settings (`earliest` by
    /// default, so records produced before subscription are seen).
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Broker`] if the client cannot be
    /// created or the subscription fails.
    pub fn create(
        broker: &BrokerSettings,
        settings: &ConsumerSettings,
        topic: &str,
    ) -> Result<Self, HarnessError> {
        let group_id = Uuid::new_v4().to_string();

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &broker.bootstrap)
            .set("group.id", &group_id)
            .set("auto.offset.reset", &settings.offset_reset);
        if broker.api_version_request {
            config.set("api.version.request", "true");
        }

        let consumer: BaseConsumer = config
            .create()
            .map_err(|e| HarnessError::Broker(format!("failed to create consumer: {e}")))?;
        consumer
            .subscribe(&[topic])
            .map_err(|e| HarnessError::Broker(format!("failed to subscribe to {topic}: {e}")))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            group_id,
        })
    }

    /// The generated consumer group id.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

impl RecordStream for KafkaRecordStream {
    async fn poll_record(
        &self,
        timeout: Duration,
    ) -> Result<Option<ConsumedRecord>, HarnessError> {
        let consumer = Arc::clone(&self.consumer);
        tokio::task::spawn_blocking(move || {
            consumer.poll(timeout).map(|result| match result {
                Ok(message) => match message.payload() {
                    Some(payload) => ConsumedRecord::with_payload(payload.to_vec()),
                    None => ConsumedRecord::default(),
                },
                Err(e) => ConsumedRecord::with_error(e.to_string()),
            })
        })
        .await
        .map_err(|e| HarnessError::Broker(format!("consumer poll task failed: {e}")))
    }
}
