//! Docker Engine client backed by `bollard`.

use super::docker::{ContainerInspection, EngineClient};
use crate::error::{ApiError, Error, Result};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{InspectContainerOptions, StopContainerOptions};
use bollard::errors::Error as BollardError;

/// Engine client talking to the local Docker daemon.
///
/// Honors `DOCKER_HOST` and falls back to the platform's default socket.
pub struct BollardEngine {
    docker: Docker,
}

impl BollardEngine {
    /// Connects using the environment's defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Connect`] when no usable endpoint is configured.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_defaults().map_err(|e| Error::Connect {
            platform: "docker".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { docker })
    }
}

fn api_error(err: BollardError) -> ApiError {
    match err {
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => ApiError::status(status_code, "", message),
        other => ApiError::transport(other.to_string()),
    }
}

#[async_trait]
impl EngineClient for BollardEngine {
    async fn inspect(&self, id: &str) -> std::result::Result<ContainerInspection, ApiError> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(api_error)?;

        let state = response.state.unwrap_or_default();
        let config = response.config.unwrap_or_default();

        Ok(ContainerInspection {
            id: response.id.unwrap_or_else(|| id.to_string()),
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code.unwrap_or_default(),
            oom_killed: state.oom_killed.unwrap_or(false),
            image: config.image.unwrap_or_default(),
            entrypoint: config.entrypoint.unwrap_or_default(),
            cmd: config.cmd.unwrap_or_default(),
            stop_timeout: config.stop_timeout,
        })
    }

    async fn stop(&self, id: &str) -> std::result::Result<(), ApiError> {
        // No timeout override: the engine applies the container's own.
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(api_error)
    }
}
