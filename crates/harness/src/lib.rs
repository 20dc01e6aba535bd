#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`HarnessError`)
//! - [`config`]: Harness configuration (`HarnessConfig`, TOML + env overrides)
//! - [`logging`]: `tracing` subscriber initialization
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`image`]: Service-under-test image build (`ImageBuild`, `DockerImageBuilder`)
//! - [`compose`]: Environment descriptor and control (`ComposeOptions`, `Environment`, `ComposeEnvironment`)
//! - [`broker`]: Probe write path (`ProbeWriter`, `KafkaProbeWriter`, `DeliveryReport`)
//! - [`probe`]: Broker readiness probe (`ReadinessProbe`)
//! - [`consumer`]: Isolated read sessions and record validation (`RecordStream`, `poll_for_valid_message`)
//! - [`control`]: Simulator value mutation (`SimulatorControl`)
//! - [`lifecycle`]: Environment lifecycle orchestration (`TestLifecycleManager`)
//!
//! # Architecture
//!
//! ```text
//! TestLifecycleManager
//!     |-- ImageBuild.build()            (docker build)
//!     |-- Environment.up()              (docker compose up)
//!     |-- ReadinessProbe.wait_until_ready()
//!     |        `-- ProbeWriter.write_probe() x <=10
//!     |-- <test body>                   (spawned task, panic-safe)
//!     |        |-- poll_for_valid_message()
//!     |        `-- SimulatorControl.change_value()
//!     `-- Environment.logs() + down()   (always, exactly once)
//! ```

pub mod broker;
pub mod compose;
pub mod config;
pub mod consumer;
pub mod control;
pub mod docker;
pub mod error;
pub mod image;
pub mod lifecycle;
pub mod logging;
pub mod probe;

// --- Public API Re-exports ---

// Lifecycle (main orchestrator)
pub use lifecycle::{LifecycleState, TestLifecycleManager};

// Configuration
pub use config::{
    BrokerSettings, ComposeSettings, ConsumerSettings, GeneralSettings, HarnessConfig,
    ImageSettings, SimulatorSettings,
};

// Error
pub use error::HarnessError;

// Environment control
pub use compose::{ComposeEnvironment, ComposeOptions, Environment};

// Image build
pub use image::{DockerImageBuilder, ImageBuild};

// Readiness probe
pub use broker::{DeliveryReport, KafkaProbeWriter, ProbeWriter};
pub use probe::ReadinessProbe;

// Consumer
pub use consumer::{ConsumedRecord, KafkaRecordStream, RecordStream, poll_for_valid_message};

// Simulator control
pub use control::SimulatorControl;

// Docker API
pub use docker::{BollardDockerClient, ContainerInfo, DockerClient, ExecOutput};

// Schema (re-exported from forwarder-logdata for test-body convenience)
pub use forwarder_logdata::{LogFrame, SchemaError, Value};
