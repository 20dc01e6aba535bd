//! Simulator control through the container runtime.
//!
//! The simulated source runs inside the compose environment and exposes
//! no network control surface; the only way to change the value it
//! publishes is to run its control utility inside the container. The
//! container is found by name marker among the running containers, and
//! the command runs privileged because the utility needs the
//! simulator's IPC namespace.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SimulatorSettings;
use crate::docker::{ContainerInfo, DockerClient};
use crate::error::HarnessError;

/// Drives value changes on the in-container simulator.
pub struct SimulatorControl<D: DockerClient> {
    docker: Arc<D>,
    marker: String,
    command: String,
}

impl<D: DockerClient> SimulatorControl<D> {
    /// Create a control handle using the marker and command from the
    /// simulator settings.
    pub fn new(docker: Arc<D>, settings: &SimulatorSettings) -> Self {
        Self {
            docker,
            marker: settings.marker.clone(),
            command: settings.command.clone(),
        }
    }

    /// Find the running simulator container.
    ///
    /// The lookup is by substring: the first running container whose
    /// name contains the marker wins.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SimulatorNotFound`] when no running
    /// container matches, and [`HarnessError::DockerApi`] when the
    /// listing itself fails.
    pub async fn find_simulator(&self) -> Result<ContainerInfo, HarnessError> {
        let containers = self.docker.list_containers().await?;
        containers
            .into_iter()
            .find(|c| c.name.contains(&self.marker))
            .ok_or_else(|| HarnessError::SimulatorNotFound {
                marker: self.marker.clone(),
            })
    }

    /// Set the named source to `value` inside the simulator container.
    ///
    /// Lookup happens first; when it fails, no command is issued
    /// anywhere. The write is fire-and-confirm: a non-zero exit from
    /// the control utility is a command failure, not a Docker failure.
    ///
    /// # Errors
    ///
    /// [`HarnessError::SimulatorNotFound`] when the lookup fails,
    /// [`HarnessError::DockerApi`] when the exec cannot run, and
    /// [`HarnessError::ControlCommandFailed`] when the utility exits
    /// non-zero.
    pub async fn change_value(&self, name: &str, value: &str) -> Result<(), HarnessError> {
        let simulator = self.find_simulator().await?;
        debug!(
            container = %simulator.name,
            id = %simulator.id,
            "found simulator container"
        );

        let cmd = vec![self.command.clone(), name.to_owned(), value.to_owned()];
        let output = self.docker.exec_command(&simulator.id, &cmd, true).await?;

        if !output.success() {
            return Err(HarnessError::ControlCommandFailed {
                container: simulator.name,
                reason: format!(
                    "{} exited with code {:?}: {}",
                    self.command,
                    output.exit_code,
                    output.output.trim()
                ),
            });
        }

        info!(source = name, value, "simulator value changed");
        Ok(())
    }
}
