//! Harness error types.
//!
//! [`HarnessError`] covers every failure class the harness can surface.
//! Variants map one-to-one onto the failure taxonomy:
//!
//! - build failure: [`HarnessError::ImageBuild`]
//! - environment operation failure: [`HarnessError::Compose`]
//! - readiness timeout: [`HarnessError::BrokerNotReady`]
//! - consumer-record error: [`HarnessError::RecordError`]
//! - record absence: [`HarnessError::NoRecord`]
//! - control lookup vs. execution: [`HarnessError::SimulatorNotFound`]
//!   vs. [`HarnessError::ControlCommandFailed`]

use forwarder_logdata::SchemaError;

/// Harness domain error.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Image build for the service under test failed.
    #[error("image build failed: {reason}")]
    ImageBuild {
        /// Build failure description.
        reason: String,
    },

    /// A `docker compose` operation failed.
    #[error("compose {op} failed: {reason}")]
    Compose {
        /// The compose subcommand (`up`, `logs`, `down`).
        op: &'static str,
        /// Failure description.
        reason: String,
    },

    /// The broker did not acknowledge a probe write within the attempt bound.
    #[error("broker was not ready after {attempts} probe attempts, aborting tests")]
    BrokerNotReady {
        /// Number of attempts performed before giving up.
        attempts: u32,
    },

    /// Producer-level broker error (configuration, queueing).
    #[error("broker error: {0}")]
    Broker(String),

    /// A polled record carried an error indicator; its payload was not decoded.
    #[error("consumer error when polling: {0}")]
    RecordError(String),

    /// No record arrived within the poll window.
    ///
    /// Treated as a test failure, not a retryable condition: the caller
    /// contract requires a record to be promptly available.
    #[error("no record received within {timeout_secs}s poll window")]
    NoRecord {
        /// Poll window that elapsed.
        timeout_secs: u64,
    },

    /// No running container matched the simulator name marker.
    #[error("no running container matches simulator marker '{marker}'")]
    SimulatorNotFound {
        /// The name marker that was searched for.
        marker: String,
    },

    /// The in-container control command failed or was rejected.
    #[error("control command failed in container '{container}': {reason}")]
    ControlCommandFailed {
        /// Container the command ran in.
        container: String,
        /// Failure description.
        reason: String,
    },

    /// Docker API call failed.
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker daemon connection failed.
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Record payload did not conform to the binary schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Invalid configuration value.
    #[error("config error: {field}: {reason}")]
    Config {
        /// Configuration field name.
        field: String,
        /// Error description.
        reason: String,
    },

    /// The spawned test body was aborted without panicking.
    #[error("test body aborted: {0}")]
    TestBody(String),
}
