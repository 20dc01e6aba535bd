//! Environment descriptor and `docker compose` control.
//!
//! [`ComposeOptions`] is the immutable environment descriptor: the
//! service-definition file plus the fixed option set the harness always
//! runs with. Stage-specific argument vectors are derived from it
//! (`up_args`, `logs_args`, `down_args`); the teardown timeout is an
//! explicit `down` argument, never a mutation of the descriptor.
//!
//! [`ComposeEnvironment`] implements the [`Environment`] trait by
//! spawning the `docker compose` CLI with inherited stdio, so compose
//! output lands in the test run's output directly.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::config::ComposeSettings;
use crate::error::HarnessError;

/// Immutable multi-service environment descriptor.
///
/// Created once per test module and never mutated afterwards. The
/// fields mirror the fixed option set the harness always passes to
/// compose; most are compile-time constants of the harness but kept
/// explicit so the descriptor documents the full contract.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Service-definition file (`-f`).
    pub file: PathBuf,
    /// Project name (`-p`); `None` means the compose default.
    pub project_name: Option<String>,
    /// Skip linked services (`--no-deps`).
    pub no_deps: bool,
    /// Recreate dependencies (`--always-recreate-deps`).
    pub always_recreate_deps: bool,
    /// Scale specifier (`--scale`); empty means unscaled.
    pub scale: String,
    /// Stop all containers when any exits (`--abort-on-container-exit`).
    pub abort_on_container_exit: bool,
    /// Explicit service selector; empty means all services.
    pub services: Vec<String>,
    /// Remove orphan containers (`--remove-orphans`).
    pub remove_orphans: bool,
    /// Reuse existing containers (`--no-recreate`).
    pub no_recreate: bool,
    /// Force recreation (`--force-recreate`).
    pub force_recreate: bool,
    /// Never build images during `up` (`--no-build`).
    pub no_build: bool,
    /// Always build images during `up` (`--build`).
    pub build: bool,
    /// Monochrome output (`--no-color`).
    pub no_color: bool,
    /// Image removal mode on `down` (`--rmi`); `"none"` removes nothing.
    pub rmi: String,
    /// Remove volumes on `down` (`--volumes`); broker and coordinator
    /// data must not persist across runs.
    pub volumes: bool,
    /// Follow log output (`--follow`).
    pub follow: bool,
    /// Timestamp log lines (`--timestamps`).
    pub timestamps: bool,
    /// Log tail mode (`--tail`).
    pub tail: String,
    /// Detach after `up` (`-d`).
    pub detach: bool,
}

impl ComposeOptions {
    /// Descriptor with the fixed harness option set for one compose file.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            project_name: None,
            no_deps: false,
            always_recreate_deps: false,
            scale: String::new(),
            abort_on_container_exit: false,
            services: Vec::new(),
            remove_orphans: false,
            no_recreate: true,
            force_recreate: false,
            no_build: false,
            build: false,
            no_color: false,
            rmi: "none".to_owned(),
            volumes: true,
            follow: false,
            timestamps: false,
            tail: "all".to_owned(),
            detach: true,
        }
    }

    /// Descriptor from the `[compose]` configuration section.
    pub fn from_settings(settings: &ComposeSettings) -> Self {
        let mut options = Self::new(&settings.file);
        if !settings.project_name.is_empty() {
            options.project_name = Some(settings.project_name.clone());
        }
        options
    }

    /// Global arguments shared by every compose invocation.
    fn global_args(&self) -> Vec<String> {
        let mut args = vec!["compose".to_owned(), "-f".to_owned()];
        args.push(self.file.display().to_string());
        if let Some(project) = &self.project_name {
            args.push("-p".to_owned());
            args.push(project.clone());
        }
        args
    }

    /// Argument vector for `docker compose up`.
    pub fn up_args(&self) -> Vec<String> {
        let mut args = self.global_args();
        args.push("up".to_owned());
        if self.detach {
            args.push("-d".to_owned());
        }
        if self.no_deps {
            args.push("--no-deps".to_owned());
        }
        if self.always_recreate_deps {
            args.push("--always-recreate-deps".to_owned());
        }
        if !self.scale.is_empty() {
            args.push("--scale".to_owned());
            args.push(self.scale.clone());
        }
        if self.abort_on_container_exit {
            args.push("--abort-on-container-exit".to_owned());
        }
        if self.remove_orphans {
            args.push("--remove-orphans".to_owned());
        }
        if self.no_recreate {
            args.push("--no-recreate".to_owned());
        }
        if self.force_recreate {
            args.push("--force-recreate".to_owned());
        }
        if self.no_build {
            args.push("--no-build".to_owned());
        }
        if self.build {
            args.push("--build".to_owned());
        }
        if self.no_color {
            args.push("--no-color".to_owned());
        }
        args.extend(self.services.iter().cloned());
        args
    }

    /// Argument vector for `docker compose logs <service>`.
    pub fn logs_args(&self, service: &str) -> Vec<String> {
        let mut args = self.global_args();
        args.push("logs".to_owned());
        args.push("--tail".to_owned());
        args.push(self.tail.clone());
        if self.follow {
            args.push("--follow".to_owned());
        }
        if self.timestamps {
            args.push("--timestamps".to_owned());
        }
        if self.no_color {
            args.push("--no-color".to_owned());
        }
        args.push(service.to_owned());
        args
    }

    /// Argument vector for `docker compose down`.
    ///
    /// The shutdown timeout is supplied explicitly at the call site; it
    /// is not part of the descriptor.
    pub fn down_args(&self, timeout: Option<Duration>) -> Vec<String> {
        let mut args = self.global_args();
        args.push("down".to_owned());
        if self.volumes {
            args.push("--volumes".to_owned());
        }
        if self.rmi != "none" {
            args.push("--rmi".to_owned());
            args.push(self.rmi.clone());
        }
        if self.remove_orphans {
            args.push("--remove-orphans".to_owned());
        }
        if let Some(timeout) = timeout {
            args.push("--timeout".to_owned());
            args.push(timeout.as_secs().to_string());
        }
        args
    }
}

/// Operations against the multi-service environment.
///
/// The lifecycle manager and the readiness probe hold the environment
/// through this trait, so scenario tests can substitute a mock that
/// counts invocations.
pub trait Environment: Send + Sync {
    /// Create and start the environment's services.
    ///
    /// Returning does not imply the services are ready.
    fn up(&self) -> impl Future<Output = Result<(), HarnessError>> + Send;

    /// Dump logs for one service.
    fn logs(&self, service: &str) -> impl Future<Output = Result<(), HarnessError>> + Send;

    /// Stop and remove the environment, including volumes.
    ///
    /// `timeout` is the per-container shutdown grace period; `None`
    /// uses the compose default.
    fn down(&self, timeout: Option<Duration>)
    -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// Environment controller backed by the `docker compose` CLI.
pub struct ComposeEnvironment {
    options: ComposeOptions,
}

impl ComposeEnvironment {
    /// Controller for one descriptor.
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    /// The wrapped descriptor.
    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    async fn run_compose(&self, op: &'static str, args: Vec<String>) -> Result<(), HarnessError> {
        info!(op = op, "running docker compose");
        let status = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| HarnessError::Compose {
                op,
                reason: format!("failed to spawn docker: {e}"),
            })?;

        if !status.success() {
            return Err(HarnessError::Compose {
                op,
                reason: format!("docker compose exited with {status}"),
            });
        }
        info!(op = op, "docker compose finished");
        Ok(())
    }
}

impl Environment for ComposeEnvironment {
    async fn up(&self) -> Result<(), HarnessError> {
        self.run_compose("up", self.options.up_args()).await
    }

    async fn logs(&self, service: &str) -> Result<(), HarnessError> {
        self.run_compose("logs", self.options.logs_args(service))
            .await
    }

    async fn down(&self, timeout: Option<Duration>) -> Result<(), HarnessError> {
        self.run_compose("down", self.options.down_args(timeout))
            .await
    }
}
