//! In-memory platform clients shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use grace::ApiError;
use grace::platforms::{ContainerInspection, EngineClient, ExecOutput, PodClient};
use k8s_openapi::api::core::v1::{
    Container, ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStatus,
    EphemeralContainer, Pod, PodSpec, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// Engine
// =============================================================================

/// Engine state observed and mutated by [`MockEngine`].
#[derive(Debug, Default)]
pub struct EngineState {
    /// What `inspect` currently returns.
    pub container: ContainerInspection,
    /// What the container looks like once stopped.
    pub after_stop: ContainerInspection,
    /// How long `stop` takes.
    pub stop_delay: Duration,
    /// Error returned by `stop`.
    pub stop_error: Option<ApiError>,
    /// Error returned by `inspect`.
    pub inspect_error: Option<ApiError>,
    /// Number of `stop` calls.
    pub stop_calls: usize,
}

pub struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub fn new(state: EngineState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }
}

/// A running engine container and its stopped counterpart.
pub fn engine_container(
    id: &str,
    exit_code: i64,
    oom_killed: bool,
    stop_timeout: Option<i64>,
    stop_delay: Duration,
) -> EngineState {
    let running = ContainerInspection {
        id: id.to_string(),
        running: true,
        exit_code: 0,
        oom_killed: false,
        image: "nginx:1.27".to_string(),
        entrypoint: vec!["/docker-entrypoint.sh".to_string()],
        cmd: vec!["nginx".to_string(), "-g".to_string(), "daemon off;".to_string()],
        stop_timeout,
    };
    let stopped = ContainerInspection {
        running: false,
        exit_code,
        oom_killed,
        ..running.clone()
    };
    EngineState {
        container: running,
        after_stop: stopped,
        stop_delay,
        ..Default::default()
    }
}

#[async_trait]
impl EngineClient for MockEngine {
    async fn inspect(&self, _id: &str) -> Result<ContainerInspection, ApiError> {
        let state = self.state();
        match &state.inspect_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.container.clone()),
        }
    }

    async fn stop(&self, _id: &str) -> Result<(), ApiError> {
        let delay = {
            let mut state = self.state();
            state.stop_calls += 1;
            if let Some(err) = &state.stop_error {
                return Err(err.clone());
            }
            state.stop_delay
        };
        tokio::time::sleep(delay).await;
        let mut state = self.state();
        state.container = state.after_stop.clone();
        Ok(())
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// Cluster state observed and mutated by [`MockCluster`].
#[derive(Debug, Default)]
pub struct ClusterState {
    pub pod: Pod,
    /// Error returned by `get`.
    pub get_error: Option<ApiError>,
    /// Error returned by the typed patch.
    pub typed_patch_error: Option<ApiError>,
    /// Error returned by the legacy patch.
    pub legacy_patch_error: Option<ApiError>,
    pub typed_patches: Vec<Value>,
    pub legacy_patches: Vec<Value>,
    /// `(container, command)` of every exec.
    pub execs: Vec<(String, Vec<String>)>,
    /// Exec errors by signaled container.
    pub exec_errors: HashMap<String, ApiError>,
    /// `(exit code, reason)` by container; defaults to `(0, "Completed")`.
    pub exits: HashMap<String, (i32, String)>,
    /// How long each container takes to exit after the signal; unlisted
    /// containers exit before the next `get`.
    pub exit_delays: HashMap<String, Duration>,
    /// Signaled containers and when they are due to exit.
    pub pending_exits: Vec<(String, Instant)>,
    /// Number of `get` calls.
    pub gets: usize,
    /// Containers that ignore the signal.
    pub stuck: HashSet<String>,
    /// Containers the kubelet restarts right after they exit.
    pub restarting: HashSet<String>,
    /// Whether an injected sidecar reaches the running state.
    pub sidecar_stuck: bool,
}

pub struct MockCluster {
    state: Mutex<ClusterState>,
}

impl MockCluster {
    pub fn new(state: ClusterState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }
}

fn running_state() -> ContainerState {
    ContainerState {
        running: Some(ContainerStateRunning::default()),
        ..Default::default()
    }
}

fn running_status(name: &str) -> ContainerStatus {
    ContainerStatus {
        name: name.to_string(),
        started: Some(true),
        ready: true,
        state: Some(running_state()),
        ..Default::default()
    }
}

/// A running pod whose containers are named `containers`, each with image
/// `registry.local/<name>:1` and command `./<name> --serve`.
pub fn running_pod(name: &str, containers: &[&str], grace_secs: Option<i64>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: containers
                .iter()
                .map(|c| Container {
                    name: c.to_string(),
                    image: Some(format!("registry.local/{c}:1")),
                    command: Some(vec![format!("./{c}")]),
                    args: Some(vec!["--serve".to_string()]),
                    ..Default::default()
                })
                .collect(),
            share_process_namespace: Some(true),
            termination_grace_period_seconds: grace_secs,
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(containers.iter().map(|c| running_status(c)).collect()),
            ..Default::default()
        }),
    }
}

impl ClusterState {
    pub fn for_pod(pod: Pod) -> Self {
        Self {
            pod,
            ..Default::default()
        }
    }

    fn add_sidecar(&mut self, debug: EphemeralContainer) {
        let name = debug.name.clone();
        self.pod
            .spec
            .get_or_insert_with(Default::default)
            .ephemeral_containers
            .get_or_insert_with(Vec::new)
            .push(debug);

        let status = if self.sidecar_stuck {
            ContainerStatus {
                name,
                ..Default::default()
            }
        } else {
            running_status(&name)
        };
        self.pod
            .status
            .get_or_insert_with(Default::default)
            .ephemeral_container_statuses
            .get_or_insert_with(Vec::new)
            .push(status);
    }

    fn signal(&mut self, container: &str) {
        match self.exit_delays.get(container) {
            Some(delay) => {
                let due = Instant::now() + *delay;
                self.pending_exits.push((container.to_string(), due));
            }
            None => self.terminate(container),
        }
    }

    fn apply_due_exits(&mut self) {
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending_exits
            .drain(..)
            .partition(|(_, at)| *at <= now);
        self.pending_exits = waiting;
        for (container, _) in due {
            self.terminate(&container);
        }
    }

    fn terminate(&mut self, container: &str) {
        if self.stuck.contains(container) {
            return;
        }
        let (exit_code, reason) = self
            .exits
            .get(container)
            .cloned()
            .unwrap_or((0, "Completed".to_string()));
        let terminated = ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                reason: Some(reason),
                ..Default::default()
            }),
            ..Default::default()
        };
        let restarting = self.restarting.contains(container);

        let statuses = self
            .pod
            .status
            .as_mut()
            .and_then(|s| s.container_statuses.as_mut())
            .expect("pod has container statuses");
        let status = statuses
            .iter_mut()
            .find(|s| s.name == container)
            .expect("signaled container has a status");

        if restarting {
            status.last_state = Some(terminated);
            status.state = Some(running_state());
            status.restart_count += 1;
        } else {
            status.state = Some(terminated);
            status.started = Some(false);
            status.ready = false;
        }
    }
}

fn sidecar_from_typed_patch(patch: &Value) -> EphemeralContainer {
    let containers = &patch["spec"]["ephemeralContainers"];
    let last = containers
        .as_array()
        .and_then(|c| c.last())
        .expect("typed patch lists ephemeral containers");
    serde_json::from_value(last.clone()).expect("valid ephemeral container")
}

fn sidecar_from_legacy_patch(patch: &Value) -> EphemeralContainer {
    serde_json::from_value(patch[0]["value"].clone()).expect("valid ephemeral container")
}

#[async_trait]
impl PodClient for MockCluster {
    fn namespace(&self) -> &str {
        "default"
    }

    async fn get(&self, _name: &str) -> Result<Pod, ApiError> {
        let mut state = self.state();
        state.gets += 1;
        state.apply_due_exits();
        match &state.get_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.pod.clone()),
        }
    }

    async fn patch_ephemeral_containers(&self, _name: &str, patch: &Value) -> Result<(), ApiError> {
        let mut state = self.state();
        state.typed_patches.push(patch.clone());
        if let Some(err) = &state.typed_patch_error {
            return Err(err.clone());
        }
        let debug = sidecar_from_typed_patch(patch);
        state.add_sidecar(debug);
        Ok(())
    }

    async fn patch_ephemeral_containers_legacy(
        &self,
        _name: &str,
        patch: &Value,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.legacy_patches.push(patch.clone());
        if let Some(err) = &state.legacy_patch_error {
            return Err(err.clone());
        }
        let debug = sidecar_from_legacy_patch(patch);
        state.add_sidecar(debug);
        Ok(())
    }

    async fn exec(
        &self,
        _name: &str,
        container: &str,
        command: &[String],
    ) -> Result<ExecOutput, ApiError> {
        let mut state = self.state();
        state.execs.push((container.to_string(), command.to_vec()));

        let target = command.last().cloned().unwrap_or_default();
        if let Some(err) = state.exec_errors.get(&target) {
            return Err(err.clone());
        }
        state.signal(&target);

        Ok(ExecOutput {
            output: Vec::new(),
            status: Some("Success".to_string()),
            message: None,
        })
    }
}
