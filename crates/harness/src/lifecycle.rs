//! Test lifecycle orchestration.
//!
//! [`TestLifecycleManager`] runs the fixed sequence every suite goes
//! through: build the image, bring the compose environment up, wait
//! for the broker, run the test body, then dump service logs and tear
//! the environment down. Teardown is scoped to [`run`]: it happens on
//! the way out of every path, exactly once, whether the body returned,
//! errored, or panicked. A panic is re-raised after teardown so the
//! test still fails the way it would have without the harness.
//!
//! [`run`]: TestLifecycleManager::run

use std::future::Future;
use std::panic;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::broker::ProbeWriter;
use crate::compose::Environment;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::image::ImageBuild;
use crate::logging;
use crate::probe::ReadinessProbe;

/// Phase the lifecycle is in, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Building,
    Starting,
    Probing,
    Running,
    TearingDown,
    Finished,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Building => "building",
            Self::Starting => "starting",
            Self::Probing => "probing",
            Self::Running => "running",
            Self::TearingDown => "tearing-down",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Orchestrates one environment lifecycle around a test body.
pub struct TestLifecycleManager<B, E, W> {
    builder: B,
    env: E,
    writer: W,
    probe: ReadinessProbe,
    log_service: String,
    teardown_timeout: Duration,
    log_dir: Option<String>,
}

impl<B, E, W> TestLifecycleManager<B, E, W>
where
    B: ImageBuild,
    E: Environment,
    W: ProbeWriter,
{
    /// Create a manager with the default probe, a 30 second teardown
    /// timeout and `forwarder` as the log service.
    pub fn new(builder: B, env: E, writer: W) -> Self {
        Self {
            builder,
            env,
            writer,
            probe: ReadinessProbe::default(),
            log_service: "forwarder".to_owned(),
            teardown_timeout: Duration::from_secs(30),
            log_dir: None,
        }
    }

    /// Create a manager whose service name, teardown timeout and log
    /// directory come from the loaded configuration.
    pub fn from_config(builder: B, env: E, writer: W, config: &HarnessConfig) -> Self {
        Self {
            builder,
            env,
            writer,
            probe: ReadinessProbe::default(),
            log_service: config.compose.log_service.clone(),
            teardown_timeout: Duration::from_secs(config.compose.shutdown_timeout_secs),
            log_dir: Some(config.general.log_dir.clone()),
        }
    }

    /// Replace the readiness probe.
    pub fn with_probe(mut self, probe: ReadinessProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Service whose logs are dumped before teardown.
    pub fn with_log_service(mut self, service: impl Into<String>) -> Self {
        self.log_service = service.into();
        self
    }

    /// Grace period passed to the environment shutdown.
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Directory whose stale `*.log` files are removed before the run.
    pub fn with_log_dir(mut self, dir: impl Into<String>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Run `body` inside a fully managed environment lifecycle.
    ///
    /// The body runs only once the broker has confirmed readiness.
    /// Whatever the body does, the environment is shut down exactly
    /// once before this returns; when the broker never becomes ready
    /// the probe performs that shutdown itself and no body runs. A
    /// panicking body is resumed after teardown.
    ///
    /// # Errors
    ///
    /// The first fatal error on the path: image build, environment
    /// start, [`HarnessError::BrokerNotReady`], the body's own error,
    /// or a teardown failure after a successful body.
    pub async fn run<T, F>(self, body: F) -> Result<T, HarnessError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, HarnessError>> + Send + 'static,
    {
        if let Some(dir) = &self.log_dir {
            match logging::clean_previous_logs(dir) {
                Ok(removed) if removed > 0 => info!(removed, dir, "removed stale log files"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, dir, "could not clean previous logs"),
            }
        }

        info!(state = %LifecycleState::Building, "building service image");
        if let Err(e) = self.builder.build().await {
            error!(error = %e, "image build failed");
            self.teardown().await.ok();
            return Err(e);
        }

        info!(state = %LifecycleState::Starting, "starting compose environment");
        if let Err(e) = self.env.up().await {
            error!(error = %e, "environment start failed");
            self.teardown().await.ok();
            return Err(e);
        }

        info!(state = %LifecycleState::Probing, "waiting for broker readiness");
        // On exhaustion the probe shuts the environment down itself;
        // that counts as this lifecycle's one teardown.
        let attempt = self.probe.wait_until_ready(&self.writer, &self.env).await?;
        info!(attempt, state = %LifecycleState::Running, "environment ready, running test body");

        // The body runs in its own task so a panic unwinds there and
        // reaches us as a join error, leaving teardown to run first.
        let outcome = tokio::spawn(body).await;

        let teardown = self.teardown().await;

        match outcome {
            Ok(result) => {
                info!(state = %LifecycleState::Finished, success = result.is_ok(), "lifecycle complete");
                // A teardown failure only surfaces when the body itself passed.
                match (result, teardown) {
                    (Ok(value), Ok(())) => Ok(value),
                    (Ok(_), Err(e)) => Err(e),
                    (Err(e), _) => Err(e),
                }
            }
            Err(join_error) => {
                if join_error.is_panic() {
                    panic::resume_unwind(join_error.into_panic());
                }
                Err(HarnessError::TestBody(format!(
                    "test body was cancelled: {join_error}"
                )))
            }
        }
    }

    async fn teardown(&self) -> Result<(), HarnessError> {
        info!(state = %LifecycleState::TearingDown, service = %self.log_service, "dumping service logs");
        if let Err(e) = self.env.logs(&self.log_service).await {
            warn!(error = %e, "could not dump service logs");
        }

        self.env
            .down(Some(self.teardown_timeout))
            .await
            .inspect_err(|e| error!(error = %e, "environment shutdown failed"))
    }
}
