//! Broker readiness probe.
//!
//! Repeatedly writes a sentinel record through a [`ProbeWriter`] until
//! a delivery report confirms the broker is accepting writes. The
//! probe is bounded on both axes: at most [`MAX_PROBE_ATTEMPTS`]
//! writes, each pumping the client event loop for at most
//! [`MAX_ATTEMPT_WAIT`]. On exhaustion the probe tears the compose
//! environment down itself and reports a fatal error, so no test body
//! ever runs against a broker that never came up.

use std::time::Duration;

use tracing::{info, warn};

use crate::broker::ProbeWriter;
use crate::compose::Environment;
use crate::error::HarnessError;

/// Upper bound on probe attempts.
pub const MAX_PROBE_ATTEMPTS: u32 = 10;
/// Upper bound on the per-attempt event-loop pump.
pub const MAX_ATTEMPT_WAIT: Duration = Duration::from_secs(10);

/// Bounded readiness probe for the broker.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    max_attempts: u32,
    attempt_wait: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self {
            max_attempts: MAX_PROBE_ATTEMPTS,
            attempt_wait: MAX_ATTEMPT_WAIT,
        }
    }
}

impl ReadinessProbe {
    /// Create a probe with explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if `max_attempts` is zero or
    /// above [`MAX_PROBE_ATTEMPTS`], or `attempt_wait` is zero or
    /// above [`MAX_ATTEMPT_WAIT`].
    pub fn new(max_attempts: u32, attempt_wait: Duration) -> Result<Self, HarnessError> {
        if max_attempts == 0 || max_attempts > MAX_PROBE_ATTEMPTS {
            return Err(HarnessError::Config {
                field: "probe.max_attempts".to_owned(),
                reason: format!("must be between 1 and {MAX_PROBE_ATTEMPTS}, got {max_attempts}"),
            });
        }
        if attempt_wait.is_zero() || attempt_wait > MAX_ATTEMPT_WAIT {
            return Err(HarnessError::Config {
                field: "probe.attempt_wait".to_owned(),
                reason: format!(
                    "must be between 1 and {} seconds, got {:?}",
                    MAX_ATTEMPT_WAIT.as_secs(),
                    attempt_wait
                ),
            });
        }
        Ok(Self {
            max_attempts,
            attempt_wait,
        })
    }

    /// Probe until the broker confirms a delivery, returning the
    /// attempt number that succeeded (1-based).
    ///
    /// A write that cannot be enqueued counts as a failed attempt, not
    /// a fatal error. When all attempts are exhausted the environment
    /// is shut down before the error is returned; a failure of that
    /// shutdown is logged but never masks the readiness failure.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::BrokerNotReady`] on exhaustion.
    pub async fn wait_until_ready<W, E>(&self, writer: &W, env: &E) -> Result<u32, HarnessError>
    where
        W: ProbeWriter,
        E: Environment,
    {
        for attempt in 1..=self.max_attempts {
            match writer.write_probe(self.attempt_wait).await {
                Ok(Some(report)) if report.is_delivered() => {
                    info!(attempt, "broker is ready");
                    return Ok(attempt);
                }
                Ok(Some(report)) => {
                    warn!(
                        attempt,
                        error = report.error().unwrap_or("unknown"),
                        "probe write was not delivered"
                    );
                }
                Ok(None) => {
                    warn!(attempt, "no delivery report within the attempt window");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "probe write failed");
                }
            }
        }

        warn!(
            attempts = self.max_attempts,
            "broker never became ready, shutting environment down"
        );
        if let Err(e) = env.down(None).await {
            warn!(error = %e, "environment shutdown after failed probe also failed");
        }
        Err(HarnessError::BrokerNotReady {
            attempts: self.max_attempts,
        })
    }
}
