//! Probe capability and the data it reports.
//!
//! A probe stops one logical target (a Docker container, or every container
//! of a pod) and reports, per physical container, what it was configured as
//! and how it died:
//!
//! ```text
//!   Target ──connect──▶ Probe ──stop──▶ [ProbeResult] ──outcome()──▶ TerminationOutcome
//!                        │
//!                        ├── Docker(DockerProbe)  engine stop API
//!                        └── Pod(PodProbe)        debug sidecar + remote kill
//! ```
//!
//! `stop` is meant to be called once per probe. Calling it again finds the
//! target no longer running and fails with [`crate::Error::NotRunning`].

use crate::config::ProbeSettings;
use crate::constants::{ELLIPSIS, MAX_COMMAND_DISPLAY_LEN};
use crate::error::Result;
use crate::platforms::{BollardEngine, DockerProbe, KubePodClient, PodProbe};
use crate::target::{Platform, Target};
use crate::termination::{TerminationOutcome, classify};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Data Model
// =============================================================================

/// Static configuration of one physical container, captured at stop time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerConfig {
    /// Platform-scoped short identifier.
    pub id: String,
    /// Image reference.
    pub image: String,
    /// Display command, at most [`MAX_COMMAND_DISPLAY_LEN`] characters.
    pub command: String,
    /// Configured stop grace period.
    #[serde(with = "duration_secs")]
    pub grace_period: Duration,
}

/// Raw facts about how a container terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerminationFacts {
    /// Exit code reported by the platform.
    pub exit_code: i64,
    /// Wall time from the stop request to confirmed termination.
    #[serde(with = "duration_secs")]
    pub stop_duration: Duration,
    /// Whether the platform reports an out-of-memory kill.
    pub oom_killed: bool,
}

/// Outcome of stopping one physical container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    /// Container configuration.
    pub config: ContainerConfig,
    /// How it terminated.
    pub facts: TerminationFacts,
    /// Grace period in force when the stop was requested.
    #[serde(with = "duration_secs")]
    pub grace_period: Duration,
}

impl ProbeResult {
    /// Pairs a configuration with its termination facts; the grace period in
    /// force is the configured one.
    pub fn new(config: ContainerConfig, facts: TerminationFacts) -> Self {
        let grace_period = config.grace_period;
        Self {
            config,
            facts,
            grace_period,
        }
    }

    /// Classifies this result.
    pub fn outcome(&self) -> TerminationOutcome {
        classify(
            self.facts.exit_code,
            self.facts.oom_killed,
            self.facts.stop_duration,
            self.grace_period,
        )
    }
}

/// Renders a command for display: words joined by spaces, cut to
/// [`MAX_COMMAND_DISPLAY_LEN`] characters with a trailing `...` when longer.
pub fn render_command<S: AsRef<str>>(words: &[S]) -> String {
    let command = words
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");

    if command.chars().count() <= MAX_COMMAND_DISPLAY_LEN {
        return command;
    }

    let keep = MAX_COMMAND_DISPLAY_LEN - ELLIPSIS.len();
    let mut truncated: String = command.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Returns at most the first `len` characters of `s`.
pub(crate) fn prefix(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// =============================================================================
// Probe Capability
// =============================================================================

/// Stops one logical container and reports how each physical container died.
#[async_trait]
pub trait ContainerProbe: Send + Sync {
    /// Human-readable target description used in logs and errors.
    fn describe(&self) -> String;

    /// Stops the target.
    ///
    /// Returns one result per physical container, in platform order.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::NotRunning`] / [`crate::Error::NotStarted`] when the target is
    ///   not in a stoppable state
    /// - Platform API failures, mapped to the matching error kind
    async fn stop(&self) -> Result<Vec<ProbeResult>>;
}

/// The closed set of platform probes.
pub enum Probe {
    /// Standalone container engine.
    Docker(DockerProbe),
    /// Orchestrated pod.
    Pod(PodProbe),
}

impl Probe {
    /// Builds the probe for `target`, connecting to its platform.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::MissingCredentials`] for pod targets without a kubeconfig
    /// - [`crate::Error::Connect`] when the platform client cannot be built
    pub async fn connect(target: &Target, settings: &ProbeSettings) -> Result<Self> {
        match target.platform {
            Platform::Docker => {
                let engine = BollardEngine::connect()?;
                Ok(Self::Docker(DockerProbe::new(Arc::new(engine), &target.name)))
            }
            Platform::Pod => {
                let kubeconfig = settings.resolve_kubeconfig()?;
                let client = KubePodClient::connect(&kubeconfig, &settings.namespace).await?;
                Ok(Self::Pod(PodProbe::new(
                    Arc::new(client),
                    &target.name,
                    settings.clone(),
                )))
            }
        }
    }
}

#[async_trait]
impl ContainerProbe for Probe {
    fn describe(&self) -> String {
        match self {
            Self::Docker(probe) => probe.describe(),
            Self::Pod(probe) => probe.describe(),
        }
    }

    async fn stop(&self) -> Result<Vec<ProbeResult>> {
        match self {
            Self::Docker(probe) => probe.stop().await,
            Self::Pod(probe) => probe.stop().await,
        }
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Probe").field(&self.describe()).finish()
    }
}

/// Serializes durations as fractional seconds.
mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}
