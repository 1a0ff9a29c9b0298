//! Standalone container engine probe.
//!
//! The engine already implements graceful stop: `stop` sends the container's
//! stop signal, waits for its configured timeout, then sends SIGKILL. The
//! probe only times that call and reads the aftermath.
//!
//! ```text
//!   inspect ──running?──▶ stop (timed) ──▶ inspect ──▶ ProbeResult
//! ```

use crate::constants::{DOCKER_DEFAULT_GRACE_PERIOD, DOCKER_SHORT_ID_LEN};
use crate::error::{ApiError, Error, Result};
use crate::probe::{
    ContainerConfig, ContainerProbe, ProbeResult, TerminationFacts, prefix, render_command,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Snapshot of a container as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInspection {
    /// Full container id.
    pub id: String,
    /// Whether the container is running.
    pub running: bool,
    /// Last exit code.
    pub exit_code: i64,
    /// Whether the last exit was an OOM kill.
    pub oom_killed: bool,
    /// Image reference.
    pub image: String,
    /// Entrypoint words.
    pub entrypoint: Vec<String>,
    /// Command words.
    pub cmd: Vec<String>,
    /// Configured stop timeout in seconds.
    pub stop_timeout: Option<i64>,
}

impl ContainerInspection {
    /// Returns the short display id.
    pub fn short_id(&self) -> &str {
        prefix(&self.id, DOCKER_SHORT_ID_LEN)
    }

    /// Returns the configured grace period, or the engine default.
    pub fn grace_period(&self) -> Duration {
        match self.stop_timeout {
            Some(secs) if secs >= 0 => Duration::from_secs(secs as u64),
            _ => DOCKER_DEFAULT_GRACE_PERIOD,
        }
    }

    /// Returns entrypoint and command as one display string.
    pub fn display_command(&self) -> String {
        let words: Vec<&str> = self
            .entrypoint
            .iter()
            .chain(self.cmd.iter())
            .map(String::as_str)
            .collect();
        render_command(&words)
    }
}

/// Container engine control API.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Reads the current state and configuration of a container.
    async fn inspect(&self, id: &str) -> std::result::Result<ContainerInspection, ApiError>;

    /// Stops a container using its own configured timeout. Returns once the
    /// container has exited.
    async fn stop(&self, id: &str) -> std::result::Result<(), ApiError>;
}

/// Probe for one engine container.
pub struct DockerProbe {
    client: Arc<dyn EngineClient>,
    container: String,
}

impl DockerProbe {
    /// Creates a probe for `container` (name or id).
    pub fn new(client: Arc<dyn EngineClient>, container: impl Into<String>) -> Self {
        Self {
            client,
            container: container.into(),
        }
    }

    async fn inspect(&self) -> Result<ContainerInspection> {
        self.client
            .inspect(&self.container)
            .await
            .map_err(|e| Error::FetchFailed {
                target: format!("container {}", self.container),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ContainerProbe for DockerProbe {
    fn describe(&self) -> String {
        format!("docker/{}", self.container)
    }

    async fn stop(&self) -> Result<Vec<ProbeResult>> {
        let before = self.inspect().await?;
        let short_id = before.short_id().to_string();

        if !before.running {
            return Err(Error::NotRunning { id: short_id });
        }

        info!(container = %short_id, "stopping container");
        let start = Instant::now();
        self.client
            .stop(&self.container)
            .await
            .map_err(|e| Error::StopFailed {
                id: short_id.clone(),
                reason: e.to_string(),
            })?;
        let stop_duration = start.elapsed();

        let after = self.inspect().await?;
        debug!(
            container = %short_id,
            exit_code = after.exit_code,
            oom_killed = after.oom_killed,
            elapsed = ?stop_duration,
            "container stopped"
        );

        let config = ContainerConfig {
            id: short_id,
            image: after.image.clone(),
            command: after.display_command(),
            grace_period: after.grace_period(),
        };
        let facts = TerminationFacts {
            exit_code: after.exit_code,
            stop_duration,
            oom_killed: after.oom_killed,
        };

        Ok(vec![ProbeResult::new(config, facts)])
    }
}
