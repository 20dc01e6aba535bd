//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use
//! `MockDockerClient`.
//!
//! The harness needs only three operations: listing running containers
//! (simulator lookup), executing a privileged in-container command
//! (value mutation), and a daemon ping (connection diagnostics).
//!
//! # Container ID Validation
//!
//! Methods that accept container IDs validate them before making Docker
//! API calls:
//! - Must be 1-64 characters
//! - Must contain only ASCII hex digits ([0-9a-fA-F])

use std::future::Future;
use std::sync::Arc;

use crate::error::HarnessError;

/// Summary of one running container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Container ID (hex).
    pub id: String,
    /// Container name without the leading slash.
    pub name: String,
    /// Image the container was created from.
    pub image: String,
    /// Container state string as reported by the daemon.
    pub status: String,
}

/// Result of one in-container command execution.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit code, when the daemon reports one.
    pub exit_code: Option<i64>,
    /// Combined stdout/stderr output.
    pub output: String,
}

impl ExecOutput {
    /// Whether the command completed with exit code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Validates a container ID to prevent injection into Docker API paths.
fn validate_container_id(id: &str) -> Result<(), HarnessError> {
    if id.is_empty() || id.len() > 64 {
        return Err(HarnessError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HarnessError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting Docker API operations.
///
/// All Docker API calls go through this trait, enabling testability via
/// mocking. Implementations:
///
/// - [`BollardDockerClient`]: production implementation using `bollard`
/// - `MockDockerClient`: configurable test double (tests only)
pub trait DockerClient: Send + Sync + 'static {
    /// Lists running containers.
    ///
    /// Only running containers are returned; stopped/exited containers
    /// are filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DockerApi`] if the API call fails.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerInfo>, HarnessError>> + Send;

    /// Executes a command inside a running container.
    ///
    /// The command is passed as an argument vector (never through a
    /// shell). When `privileged` is set the exec runs with elevated
    /// privileges.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DockerApi`] for an invalid ID or a
    /// failed exec creation/start. A non-zero exit code is NOT an
    /// error at this layer; callers inspect [`ExecOutput::exit_code`].
    fn exec_command(
        &self,
        container_id: &str,
        cmd: &[String],
        privileged: bool,
    ) -> impl Future<Output = Result<ExecOutput, HarnessError>> + Send;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DockerConnection`] if the daemon is
    /// unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket or TCP
/// connection. Internally uses `Arc<bollard::Docker>` for safe sharing
/// across async tasks.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DockerConnection`] if the connection
    /// fails (socket not found, permission denied, daemon not running).
    pub fn connect_local() -> Result<Self, HarnessError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            HarnessError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DockerConnection`] if the connection fails.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, HarnessError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    HarnessError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, HarnessError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false, // Running containers only; the simulator must be live to receive commands
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| HarnessError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let id = container.id.unwrap_or_default();
            let names = container.names.unwrap_or_default();
            let name = names
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let image = container.image.unwrap_or_default();
            let status = container.state.unwrap_or_default();

            result.push(ContainerInfo {
                id,
                name,
                image,
                status,
            });
        }

        Ok(result)
    }

    async fn exec_command(
        &self,
        container_id: &str,
        cmd: &[String],
        privileged: bool,
    ) -> Result<ExecOutput, HarnessError> {
        validate_container_id(container_id)?;

        use bollard::exec::{CreateExecOptions, StartExecResults};
        use futures_util::StreamExt;

        let created = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions::<String> {
                    cmd: Some(cmd.to_vec()),
                    privileged: Some(privileged),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| HarnessError::DockerApi(format!("create exec failed: {e}")))?;

        let mut collected = String::new();
        match self
            .docker
            .start_exec(&created.id, None)
            .await
            .map_err(|e| HarnessError::DockerApi(format!("start exec failed: {e}")))?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    match chunk {
                        Ok(log) => collected.push_str(&log.to_string()),
                        Err(e) => {
                            return Err(HarnessError::DockerApi(format!(
                                "exec output stream failed: {e}"
                            )));
                        }
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let inspected = self
            .docker
            .inspect_exec(&created.id)
            .await
            .map_err(|e| HarnessError::DockerApi(format!("inspect exec failed: {e}")))?;

        Ok(ExecOutput {
            exit_code: inspected.exit_code,
            output: collected,
        })
    }

    async fn ping(&self) -> Result<(), HarnessError> {
        self.docker
            .ping()
            .await
            .map_err(|e| HarnessError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// Configurable mock Docker client for unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// Containers returned by `list_containers`.
    pub containers: Vec<ContainerInfo>,
    /// Exit code reported for every exec.
    pub exec_exit_code: Option<i64>,
    /// Whether `exec_command` should fail at the API level.
    pub fail_exec: bool,
    /// Executed commands, recorded as (container_id, cmd, privileged).
    pub exec_log: std::sync::Mutex<Vec<(String, Vec<String>, bool)>>,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self {
            exec_exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn with_containers(mut self, containers: Vec<ContainerInfo>) -> Self {
        self.containers = containers;
        self
    }

    pub fn with_exec_exit_code(mut self, code: i64) -> Self {
        self.exec_exit_code = Some(code);
        self
    }

    pub fn with_failing_exec(mut self) -> Self {
        self.fail_exec = true;
        self
    }

    pub fn exec_count(&self) -> usize {
        self.exec_log.lock().map(|log| log.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, HarnessError> {
        Ok(self.containers.clone())
    }

    async fn exec_command(
        &self,
        container_id: &str,
        cmd: &[String],
        privileged: bool,
    ) -> Result<ExecOutput, HarnessError> {
        validate_container_id(container_id)?;
        if self.fail_exec {
            return Err(HarnessError::DockerApi("mock exec failure".to_owned()));
        }
        if let Ok(mut log) = self.exec_log.lock() {
            log.push((container_id.to_owned(), cmd.to_vec(), privileged));
        }
        Ok(ExecOutput {
            exit_code: self.exec_exit_code,
            output: String::new(),
        })
    }

    async fn ping(&self) -> Result<(), HarnessError> {
        Ok(())
    }
}
