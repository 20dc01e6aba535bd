//! Harness configuration -- `systest.toml` parsing and runtime settings.
//!
//! [`HarnessConfig`] is the top-level structure; each module reads only
//! its own section.
//!
//! # Loading precedence
//! 1. Environment variables (`FWD_SYSTEST_BROKER_BOOTSTRAP=...` form)
//! 2. Configuration file (`systest.toml`)
//! 3. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), forwarder_harness::HarnessError> {
//! use forwarder_harness::HarnessConfig;
//!
//! // Load from file + apply env overrides
//! let config = HarnessConfig::load("systest.toml").await?;
//!
//! // Parse a TOML string directly
//! let config = HarnessConfig::parse("[broker]\nbootstrap = \"localhost:9092\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Logging and housekeeping.
    #[serde(default)]
    pub general: GeneralSettings,
    /// Broker endpoint and sentinel probe topic.
    #[serde(default)]
    pub broker: BrokerSettings,
    /// Consumer session defaults.
    #[serde(default)]
    pub consumer: ConsumerSettings,
    /// Compose environment settings.
    #[serde(default)]
    pub compose: ComposeSettings,
    /// Service-under-test image build settings.
    #[serde(default)]
    pub image: ImageSettings,
    /// Simulator control settings.
    #[serde(default)]
    pub simulator: SimulatorSettings,
}

/// Logging and log-file housekeeping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level filter (`trace`..`error`).
    pub log_level: String,
    /// Log output format: `"json"` or `"pretty"`.
    pub log_format: String,
    /// Directory holding per-run `*.log` files, cleaned before each run.
    pub log_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            log_dir: "logs".to_owned(),
        }
    }
}

/// Broker bootstrap and readiness-probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Bootstrap endpoint address.
    pub bootstrap: String,
    /// Request broker API-version negotiation on connect.
    pub api_version_request: bool,
    /// Sentinel topic used only for liveness probing, distinct from domain topics.
    pub probe_topic: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            bootstrap: "localhost:9092".to_owned(),
            api_version_request: true,
            probe_topic: "waitUntilUp".to_owned(),
        }
    }
}

/// Consumer session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    /// Offset reset policy for fresh sessions (`"earliest"` or `"latest"`).
    pub offset_reset: String,
    /// Poll window for [`poll_for_valid_message`](crate::poll_for_valid_message), seconds.
    pub poll_timeout_secs: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            offset_reset: "earliest".to_owned(),
            poll_timeout_secs: 1,
        }
    }
}

/// Compose environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    /// Service-definition file passed to `docker compose -f`.
    pub file: String,
    /// Optional compose project name (`-p`); empty means compose default.
    pub project_name: String,
    /// Shutdown timeout passed to `down`, seconds.
    pub shutdown_timeout_secs: u64,
    /// Service whose logs are dumped at teardown.
    pub log_service: String,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            file: "compose/docker-compose.yml".to_owned(),
            project_name: String::new(),
            shutdown_timeout_secs: 30,
            log_service: "forwarder".to_owned(),
        }
    }
}

/// Image build settings for the service under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Build context directory.
    pub context_dir: String,
    /// Image tag to build.
    pub tag: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            context_dir: "..".to_owned(),
            tag: "forwarder:latest".to_owned(),
        }
    }
}

/// Simulator control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Substring identifying the simulator container by name.
    pub marker: String,
    /// In-container command used to set an input value.
    pub command: String,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            marker: "_ioc_".to_owned(),
            command: "caput".to_owned(),
        }
    }
}

/// Bound constants for validation.
const MAX_POLL_TIMEOUT_SECS: u64 = 60;
const MAX_SHUTDOWN_TIMEOUT_SECS: u64 = 300;

impl HarnessConfig {
    /// Load configuration from a TOML file and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration fails validation.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| HarnessError::Config {
                    field: "file".to_owned(),
                    reason: format!("{}: {e}", path.display()),
                })?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] on malformed TOML.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        toml::from_str(toml_str).map_err(|e| HarnessError::Config {
            field: "toml".to_owned(),
            reason: e.to_string(),
        })
    }

    /// Override configuration values from environment variables.
    ///
    /// Naming rule: `FWD_SYSTEST_{SECTION}_{FIELD}`,
    /// e.g. `FWD_SYSTEST_BROKER_BOOTSTRAP=kafka:9092`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "FWD_SYSTEST_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "FWD_SYSTEST_GENERAL_LOG_FORMAT",
        );
        override_string(&mut self.general.log_dir, "FWD_SYSTEST_GENERAL_LOG_DIR");

        // Broker
        override_string(&mut self.broker.bootstrap, "FWD_SYSTEST_BROKER_BOOTSTRAP");
        override_bool(
            &mut self.broker.api_version_request,
            "FWD_SYSTEST_BROKER_API_VERSION_REQUEST",
        );
        override_string(
            &mut self.broker.probe_topic,
            "FWD_SYSTEST_BROKER_PROBE_TOPIC",
        );

        // Consumer
        override_string(
            &mut self.consumer.offset_reset,
            "FWD_SYSTEST_CONSUMER_OFFSET_RESET",
        );
        override_u64(
            &mut self.consumer.poll_timeout_secs,
            "FWD_SYSTEST_CONSUMER_POLL_TIMEOUT_SECS",
        );

        // Compose
        override_string(&mut self.compose.file, "FWD_SYSTEST_COMPOSE_FILE");
        override_string(
            &mut self.compose.project_name,
            "FWD_SYSTEST_COMPOSE_PROJECT_NAME",
        );
        override_u64(
            &mut self.compose.shutdown_timeout_secs,
            "FWD_SYSTEST_COMPOSE_SHUTDOWN_TIMEOUT_SECS",
        );
        override_string(
            &mut self.compose.log_service,
            "FWD_SYSTEST_COMPOSE_LOG_SERVICE",
        );

        // Image
        override_string(&mut self.image.context_dir, "FWD_SYSTEST_IMAGE_CONTEXT_DIR");
        override_string(&mut self.image.tag, "FWD_SYSTEST_IMAGE_TAG");

        // Simulator
        override_string(&mut self.simulator.marker, "FWD_SYSTEST_SIMULATOR_MARKER");
        override_string(&mut self.simulator.command, "FWD_SYSTEST_SIMULATOR_COMMAND");
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.general.log_format != "json" && self.general.log_format != "pretty" {
            return Err(HarnessError::Config {
                field: "general.log_format".to_owned(),
                reason: format!(
                    "unknown format '{}', expected 'json' or 'pretty'",
                    self.general.log_format
                ),
            });
        }

        if self.broker.bootstrap.is_empty() {
            return Err(HarnessError::Config {
                field: "broker.bootstrap".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.broker.probe_topic.is_empty() {
            return Err(HarnessError::Config {
                field: "broker.probe_topic".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.consumer.offset_reset != "earliest" && self.consumer.offset_reset != "latest" {
            return Err(HarnessError::Config {
                field: "consumer.offset_reset".to_owned(),
                reason: format!(
                    "unknown policy '{}', expected 'earliest' or 'latest'",
                    self.consumer.offset_reset
                ),
            });
        }

        if self.consumer.poll_timeout_secs == 0
            || self.consumer.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS
        {
            return Err(HarnessError::Config {
                field: "consumer.poll_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_POLL_TIMEOUT_SECS}"),
            });
        }

        if self.compose.file.is_empty() {
            return Err(HarnessError::Config {
                field: "compose.file".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.compose.shutdown_timeout_secs == 0
            || self.compose.shutdown_timeout_secs > MAX_SHUTDOWN_TIMEOUT_SECS
        {
            return Err(HarnessError::Config {
                field: "compose.shutdown_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_SHUTDOWN_TIMEOUT_SECS}"),
            });
        }

        if self.compose.log_service.is_empty() {
            return Err(HarnessError::Config {
                field: "compose.log_service".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.image.tag.is_empty() {
            return Err(HarnessError::Config {
                field: "image.tag".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.simulator.marker.is_empty() {
            return Err(HarnessError::Config {
                field: "simulator.marker".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.simulator.command.is_empty() {
            return Err(HarnessError::Config {
                field: "simulator.command".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

fn override_string(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(var = var, value = %value, "ignoring non-boolean env override"),
        }
    }
}

fn override_u64(target: &mut u64, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(var = var, value = %value, "ignoring non-numeric env override"),
        }
    }
}
