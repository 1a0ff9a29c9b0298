//! Sequential run over many targets.
//!
//! Targets are connected first, then stopped one at a time in request order.
//! Results are concatenated in that same order.

use crate::config::ProbeSettings;
use crate::error::{Error, Result};
use crate::probe::{ContainerProbe, Probe, ProbeResult};
use crate::target::Target;
use tracing::{error, info};

/// What to do when a target fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run at the first failure.
    #[default]
    Abort,
    /// Record the failure and continue with the next target.
    Isolate,
}

/// A target that failed under [`FailurePolicy::Isolate`].
#[derive(Debug)]
pub struct TargetFailure {
    /// Target description.
    pub target: String,
    /// What went wrong.
    pub error: Error,
}

/// Results of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Results of every successful target, in request order.
    pub results: Vec<ProbeResult>,
    /// Failed targets; connection failures come first.
    pub failures: Vec<TargetFailure>,
}

impl RunReport {
    /// Returns true when every target succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, target: String, error: Error, policy: FailurePolicy) -> Result<()> {
        error!(probe = %target, error = %error, "target failed");
        match policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Isolate => {
                self.failures.push(TargetFailure { target, error });
                Ok(())
            }
        }
    }
}

/// Stops every probe in order.
///
/// # Errors
///
/// Under [`FailurePolicy::Abort`], the first probe error.
pub async fn run_probes(probes: &[Probe], policy: FailurePolicy) -> Result<RunReport> {
    let mut report = RunReport::default();

    for probe in probes {
        let target = probe.describe();
        info!(probe = %target, "probing");
        match probe.stop().await {
            Ok(results) => report.results.extend(results),
            Err(e) => report.record(target, e, policy)?,
        }
    }

    Ok(report)
}

/// Connects to and stops every target.
///
/// All targets are connected before anything is stopped, so under
/// [`FailurePolicy::Abort`] a bad target leaves every container untouched.
///
/// # Errors
///
/// Under [`FailurePolicy::Abort`], the first connection or probe error.
pub async fn run(
    targets: &[Target],
    settings: &ProbeSettings,
    policy: FailurePolicy,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    let mut probes = Vec::with_capacity(targets.len());

    for target in targets {
        match Probe::connect(target, settings).await {
            Ok(probe) => probes.push(probe),
            Err(e) => report.record(target.to_string(), e, policy)?,
        }
    }

    let stopped = run_probes(&probes, policy).await?;
    report.results = stopped.results;
    report.failures.extend(stopped.failures);
    Ok(report)
}
