//! Probe write path against the broker.
//!
//! [`ProbeWriter`] is the seam the readiness probe drives: one write of
//! the sentinel record followed by a bounded, synchronous pump of the
//! client event loop, returning at most one [`DeliveryReport`]. The
//! production implementation, [`KafkaProbeWriter`], uses an rdkafka
//! `BaseProducer` whose delivery callback pushes reports into a
//! channel; `write_probe` drains stale reports before sending so every
//! report is consumed exactly once by exactly one attempt.

use std::future::Future;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use rdkafka::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{BaseProducer, BaseRecord, DeliveryResult, ProducerContext};

use crate::config::BrokerSettings;
use crate::error::HarnessError;

/// Payload of the sentinel probe record.
const PROBE_PAYLOAD: &str = "Test message";

/// Outcome of one acknowledged (or failed) probe write.
///
/// Produced by the broker client in response to a single write and
/// consumed exactly once by the probe attempt that triggered it.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    error: Option<String>,
}

impl DeliveryReport {
    /// Report for a successful delivery.
    pub fn delivered() -> Self {
        Self { error: None }
    }

    /// Report for a failed delivery.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }

    /// Whether the write was delivered without error.
    pub fn is_delivered(&self) -> bool {
        self.error.is_none()
    }

    /// The delivery error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// One probe write plus a bounded event-loop pump.
pub trait ProbeWriter: Send + Sync {
    /// Write one sentinel record and pump the client event loop for up
    /// to `wait`, returning the delivery report if one arrived.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Broker`] if the write could not even be
    /// enqueued (the probe treats this as a failed attempt, not a
    /// fatal error).
    fn write_probe(
        &self,
        wait: Duration,
    ) -> impl Future<Output = Result<Option<DeliveryReport>, HarnessError>> + Send;
}

/// Delivery callback context: forwards each report into a channel.
struct DeliveryContext {
    reports: mpsc::Sender<DeliveryReport>,
}

impl ClientContext for DeliveryContext {}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _delivery_opaque: ()) {
        let report = match delivery_result {
            Ok(_) => DeliveryReport::delivered(),
            Err((e, _)) => DeliveryReport::failed(e.to_string()),
        };
        // The receiver outlives the producer; a send failure here only
        // means the writer is already being torn down.
        let _ = self.reports.send(report);
    }
}

struct WriterInner {
    producer: BaseProducer<DeliveryContext>,
    reports: Mutex<mpsc::Receiver<DeliveryReport>>,
    topic: String,
}

impl WriterInner {
    fn attempt(&self, wait: Duration) -> Result<Option<DeliveryReport>, HarnessError> {
        let reports = self
            .reports
            .lock()
            .map_err(|_| HarnessError::Broker("delivery report channel poisoned".to_owned()))?;

        // Drop stale reports from earlier attempts so the report we
        // read below belongs to the write we are about to issue.
        while reports.try_recv().is_ok() {}

        self.producer
            .send(BaseRecord::<(), str>::to(&self.topic).payload(PROBE_PAYLOAD))
            .map_err(|(e, _)| HarnessError::Broker(format!("probe produce failed: {e}")))?;

        // Synchronous bounded pump; invokes the delivery callback zero
        // or one times for the record above.
        self.producer.poll(wait);

        Ok(reports.try_recv().ok())
    }
}

/// Production probe writer over an rdkafka `BaseProducer`.
pub struct KafkaProbeWriter {
    inner: Arc<WriterInner>,
}

impl KafkaProbeWriter {
    /// Create a producer against the configured bootstrap endpoint.
    ///
    /// API-version negotiation is requested when the settings ask for
    /// it, matching the forwarder's own client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Broker`] if the client cannot be created.
    pub fn new(settings: &BrokerSettings) -> Result<Self, HarnessError> {
        let (tx, rx) = mpsc::channel();

        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &settings.bootstrap);
        if settings.api_version_request {
            config.set("api.version.request", "true");
        }

        let producer = config
            .create_with_context(DeliveryContext { reports: tx })
            .map_err(|e| HarnessError::Broker(format!("failed to create probe producer: {e}")))?;

        Ok(Self {
            inner: Arc::new(WriterInner {
                producer,
                reports: Mutex::new(rx),
                topic: settings.probe_topic.clone(),
            }),
        })
    }
}

impl ProbeWriter for KafkaProbeWriter {
    async fn write_probe(&self, wait: Duration) -> Result<Option<DeliveryReport>, HarnessError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.attempt(wait))
            .await
            .map_err(|e| HarnessError::Broker(format!("probe task failed: {e}")))?
    }
}
