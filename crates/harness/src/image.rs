//! Service-under-test image build.
//!
//! One-shot `docker build` of the forwarder image from local source.
//! Build output is streamed line by line through `tracing` so a hanging
//! build is visible immediately. `http_proxy`/`https_proxy` from the
//! harness process environment are forwarded as build args.

use std::future::Future;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::info;

use crate::config::ImageSettings;
use crate::error::HarnessError;

/// One-shot image build seam for the lifecycle manager.
pub trait ImageBuild: Send + Sync {
    /// Build the service-under-test image.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ImageBuild`] if the build cannot be
    /// started or exits non-zero.
    fn build(&self) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// Production builder shelling out to `docker build`.
pub struct DockerImageBuilder {
    settings: ImageSettings,
}

impl DockerImageBuilder {
    pub fn new(settings: ImageSettings) -> Self {
        Self { settings }
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_owned(),
            "-t".to_owned(),
            self.settings.tag.clone(),
        ];
        for proxy_var in ["http_proxy", "https_proxy"] {
            if let Ok(value) = std::env::var(proxy_var) {
                args.push("--build-arg".to_owned());
                args.push(format!("{proxy_var}={value}"));
            }
        }
        args.push(self.settings.context_dir.clone());
        args
    }
}

impl ImageBuild for DockerImageBuilder {
    async fn build(&self) -> Result<(), HarnessError> {
        info!(tag = %self.settings.tag, context = %self.settings.context_dir, "building forwarder image");

        let mut child = Command::new("docker")
            .args(self.build_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HarnessError::ImageBuild {
                reason: format!("failed to spawn docker build: {e}"),
            })?;

        // Stream both pipes; docker build writes progress to either
        // depending on the builder in use.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(stream_lines(stdout, "stdout"));
        let stderr_task = tokio::spawn(stream_lines(stderr, "stderr"));

        let status = child.wait().await.map_err(|e| HarnessError::ImageBuild {
            reason: format!("failed to wait for docker build: {e}"),
        })?;

        let _ = stdout_task.await;
        let _ = stderr_task.await;

        if !status.success() {
            return Err(HarnessError::ImageBuild {
                reason: format!("docker build exited with {status}"),
            });
        }

        info!(tag = %self.settings.tag, "forwarder image built");
        Ok(())
    }
}

async fn stream_lines<R>(pipe: Option<R>, stream: &'static str)
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let Some(pipe) = pipe else { return };
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(stream = stream, "{line}");
    }
}
