//! Orchestrated pod probe.
//!
//! Stops every container of a pod, one at a time, without deleting the pod:
//!
//! ```text
//!   Fetch ──▶ InjectDebugSidecar ──▶ ReconfirmPod (sidecar running)
//!                                          │
//!       ┌──────────────────────────────────┘
//!       ▼   for each container, in spec order
//!   VerifyRunning ──▶ kill via sidecar exec ──▶ poll until terminated ──▶ ProbeResult
//! ```
//!
//! The pod must share its process namespace (`shareProcessNamespace: true`)
//! for the sidecar to see the processes it signals.
//!
//! # Bounds
//!
//! | Wait                   | Deadline                          |
//! |------------------------|-----------------------------------|
//! | sidecar start          | `sidecar_start_timeout`           |
//! | signal session         | `exec_timeout`                    |
//! | container termination  | grace period + `poll_headroom`    |
//!
//! # Partial failures
//!
//! If container N fails, results for containers 1..N-1 are discarded. When at
//! least one container was already stopped, the error is wrapped in
//! [`Error::PodStopAborted`] naming them; otherwise it is returned as is.

use super::sidecar::{debug_container, inject};
use crate::config::ProbeSettings;
use crate::constants::{
    OOM_KILLED_REASON, POD_DEFAULT_GRACE_PERIOD, POD_SHORT_NAME_LEN, SIGNAL_COMMAND,
};
use crate::error::{ApiError, Error, Result};
use crate::probe::{
    ContainerConfig, ContainerProbe, ProbeResult, TerminationFacts, prefix, render_command,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, ContainerStateTerminated, ContainerStatus, Pod};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info};

// =============================================================================
// Client Seam
// =============================================================================

/// Output of a remote exec session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Bytes written to the terminal.
    pub output: Vec<u8>,
    /// Final session status (`Success` / `Failure`), when reported.
    pub status: Option<String>,
    /// Status message, when reported.
    pub message: Option<String>,
}

impl ExecOutput {
    /// Returns the failure message if the session reported failure.
    pub fn failure(&self) -> Option<String> {
        match self.status.as_deref() {
            Some("Failure") => Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "command failed".to_string()),
            ),
            _ => None,
        }
    }
}

/// Cluster API operations the pod probe needs, scoped to one namespace.
#[async_trait]
pub trait PodClient: Send + Sync {
    /// Namespace this client operates in.
    fn namespace(&self) -> &str;

    /// Reads a pod.
    async fn get(&self, name: &str) -> std::result::Result<Pod, ApiError>;

    /// Applies a strategic-merge patch to the `ephemeralcontainers`
    /// sub-resource.
    async fn patch_ephemeral_containers(
        &self,
        name: &str,
        patch: &Value,
    ) -> std::result::Result<(), ApiError>;

    /// Applies a JSON patch to the `ephemeralcontainers` sub-resource, as
    /// understood by servers older than 1.22.
    async fn patch_ephemeral_containers_legacy(
        &self,
        name: &str,
        patch: &Value,
    ) -> std::result::Result<(), ApiError>;

    /// Runs `command` in `container` of pod `name` with a TTY, waiting for it
    /// to finish.
    async fn exec(
        &self,
        name: &str,
        container: &str,
        command: &[String],
    ) -> std::result::Result<ExecOutput, ApiError>;
}

// =============================================================================
// Pod Helpers
// =============================================================================

fn container_status<'a>(pod: &'a Pod, name: &str) -> Option<&'a ContainerStatus> {
    pod.status
        .as_ref()?
        .container_statuses
        .as_ref()?
        .iter()
        .find(|s| s.name == name)
}

fn ephemeral_status<'a>(pod: &'a Pod, name: &str) -> Option<&'a ContainerStatus> {
    pod.status
        .as_ref()?
        .ephemeral_container_statuses
        .as_ref()?
        .iter()
        .find(|s| s.name == name)
}

fn is_running(status: &ContainerStatus) -> bool {
    status.state.as_ref().is_some_and(|s| s.running.is_some())
}

/// Returns the terminated state of a container, including one the kubelet
/// already restarted since `restarts_before`.
fn terminated_state(
    status: &ContainerStatus,
    restarts_before: i32,
) -> Option<ContainerStateTerminated> {
    if let Some(terminated) = status.state.as_ref().and_then(|s| s.terminated.clone()) {
        return Some(terminated);
    }
    if status.restart_count > restarts_before {
        return status.last_state.as_ref().and_then(|s| s.terminated.clone());
    }
    None
}

/// Grace period of a pod: deletion grace period, then the spec's
/// termination grace period, then the kubelet default.
pub fn pod_grace_period(pod: &Pod) -> Duration {
    pod.metadata
        .deletion_grace_period_seconds
        .or_else(|| pod.spec.as_ref()?.termination_grace_period_seconds)
        .filter(|secs| *secs >= 0)
        .map(|secs| Duration::from_secs(secs as u64))
        .unwrap_or(POD_DEFAULT_GRACE_PERIOD)
}

fn display_command(container: &Container) -> String {
    let words: Vec<&str> = container
        .command
        .iter()
        .flatten()
        .chain(container.args.iter().flatten())
        .map(String::as_str)
        .collect();
    render_command(&words)
}

// =============================================================================
// Probe
// =============================================================================

/// Probe for every container of one pod.
pub struct PodProbe {
    client: Arc<dyn PodClient>,
    pod: String,
    settings: ProbeSettings,
}

impl PodProbe {
    /// Creates a probe for pod `pod` in the client's namespace.
    pub fn new(
        client: Arc<dyn PodClient>,
        pod: impl Into<String>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            client,
            pod: pod.into(),
            settings,
        }
    }

    fn qualified(&self, container: &str) -> String {
        format!("{}/{}", self.pod, container)
    }

    async fn fetch(&self) -> Result<Pod> {
        self.client.get(&self.pod).await.map_err(|e| {
            if e.is_not_found() {
                Error::PodNotFound {
                    namespace: self.client.namespace().to_string(),
                    name: self.pod.clone(),
                }
            } else {
                Error::FetchFailed {
                    target: format!("pod {}", self.pod),
                    reason: e.to_string(),
                }
            }
        })
    }

    /// Re-fetches the pod until the sidecar runs.
    async fn poll_sidecar(&self, sidecar: &str) -> Result<Pod> {
        loop {
            let pod = self.fetch().await?;
            if let Some(status) = ephemeral_status(&pod, sidecar) {
                if is_running(status) {
                    return Ok(pod);
                }
                // Ephemeral containers are never restarted or removed.
                if status.state.as_ref().is_some_and(|s| s.terminated.is_some()) {
                    return Err(Error::SidecarExited {
                        pod: self.pod.clone(),
                        sidecar: sidecar.to_string(),
                    });
                }
            }
            debug!(pod = %self.pod, sidecar, "waiting for debug container");
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn wait_for_sidecar(&self, sidecar: &str) -> Result<Pod> {
        timeout(self.settings.sidecar_start_timeout, self.poll_sidecar(sidecar))
            .await
            .unwrap_or_else(|_| {
                Err(Error::PollTimeout {
                    what: format!("debug container {}", self.qualified(sidecar)),
                    duration: self.settings.sidecar_start_timeout,
                })
            })
    }

    /// Sends the stop signal to `container` from inside the sidecar.
    async fn signal(&self, sidecar: &str, container: &str) -> Result<()> {
        let command = vec![SIGNAL_COMMAND.to_string(), container.to_string()];
        let shutdown_failed = |reason: String| Error::ShutdownFailed {
            container: self.qualified(container),
            reason,
        };

        let output = timeout(
            self.settings.exec_timeout,
            self.client.exec(&self.pod, sidecar, &command),
        )
        .await
        .map_err(|_| {
            shutdown_failed(format!(
                "signal session did not finish within {:?}",
                self.settings.exec_timeout
            ))
        })?
        .map_err(|e| shutdown_failed(e.to_string()))?;

        if !output.output.is_empty() {
            debug!(
                pod = %self.pod,
                container,
                output = %String::from_utf8_lossy(&output.output).trim_end(),
                "signal session output"
            );
        }

        match output.failure() {
            Some(reason) => Err(shutdown_failed(reason)),
            None => Ok(()),
        }
    }

    /// Re-fetches the pod until `container` reports a terminated state.
    async fn poll_terminated(
        &self,
        container: &str,
        restarts_before: i32,
    ) -> Result<(Pod, ContainerStateTerminated)> {
        loop {
            let pod = self.fetch().await?;
            if let Some(terminated) =
                container_status(&pod, container).and_then(|s| terminated_state(s, restarts_before))
            {
                return Ok((pod, terminated));
            }
            debug!(pod = %self.pod, container, "waiting for container to terminate");
            sleep(self.settings.poll_interval).await;
        }
    }

    /// Stops one container of `pod`, returning its result and the latest pod.
    async fn stop_container(
        &self,
        pod: &Pod,
        sidecar: &str,
        container: &Container,
    ) -> Result<(ProbeResult, Pod)> {
        let name = container.name.as_str();
        let status = container_status(pod, name).ok_or_else(|| Error::NotStarted {
            id: self.qualified(name),
        })?;
        let terminated = status.state.as_ref().is_some_and(|s| s.terminated.is_some());
        if !terminated && status.started != Some(true) {
            return Err(Error::NotStarted {
                id: self.qualified(name),
            });
        }
        if !is_running(status) {
            return Err(Error::NotRunning {
                id: self.qualified(name),
            });
        }

        let grace_period = pod_grace_period(pod);
        let deadline = self.settings.termination_deadline(grace_period);
        let restarts_before = status.restart_count;

        info!(pod = %self.pod, container = name, grace = ?grace_period, "stopping container");
        let start = Instant::now();
        self.signal(sidecar, name).await?;

        let (latest, terminated) = timeout(deadline, self.poll_terminated(name, restarts_before))
            .await
            .unwrap_or_else(|_| {
                Err(Error::PollTimeout {
                    what: format!("container {} to terminate", self.qualified(name)),
                    duration: deadline,
                })
            })?;
        let stop_duration = start.elapsed();

        debug!(
            pod = %self.pod,
            container = name,
            exit_code = terminated.exit_code,
            reason = terminated.reason.as_deref().unwrap_or(""),
            elapsed = ?stop_duration,
            "container terminated"
        );

        let config = ContainerConfig {
            id: format!(
                "{}/{}",
                prefix(&self.pod, POD_SHORT_NAME_LEN),
                prefix(name, POD_SHORT_NAME_LEN)
            ),
            image: container.image.clone().unwrap_or_default(),
            command: display_command(container),
            grace_period,
        };
        let facts = TerminationFacts {
            exit_code: i64::from(terminated.exit_code),
            stop_duration,
            oom_killed: terminated.reason.as_deref() == Some(OOM_KILLED_REASON),
        };

        Ok((ProbeResult::new(config, facts), latest))
    }
}

#[async_trait]
impl ContainerProbe for PodProbe {
    fn describe(&self) -> String {
        format!("pod/{}/{}", self.client.namespace(), self.pod)
    }

    async fn stop(&self) -> Result<Vec<ProbeResult>> {
        let pod = self.fetch().await?;

        let sidecar = debug_container(&self.pod, &self.settings.debug_image);
        let path = inject(self.client.as_ref(), &pod, &sidecar).await?;
        debug!(pod = %self.pod, ?path, "debug container injected");

        let mut current = self.wait_for_sidecar(&sidecar.name).await?;
        let containers = current
            .spec
            .as_ref()
            .map(|spec| spec.containers.clone())
            .unwrap_or_default();

        let mut results = Vec::with_capacity(containers.len());
        let mut stopped = Vec::new();
        for container in &containers {
            match self.stop_container(&current, &sidecar.name, container).await {
                Ok((result, latest)) => {
                    stopped.push(container.name.clone());
                    results.push(result);
                    current = latest;
                }
                Err(source) if stopped.is_empty() => return Err(source),
                Err(source) => {
                    return Err(Error::PodStopAborted {
                        pod: self.pod.clone(),
                        stopped,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(results)
    }
}
