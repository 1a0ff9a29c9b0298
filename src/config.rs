//! Probe settings.
//!
//! Every wait the probes perform is bounded by a value here. Defaults come
//! from [`crate::constants`]; the CLI overrides them from flags and
//! environment variables.

use crate::constants::{
    DEFAULT_DEBUG_IMAGE, DEFAULT_EXEC_TIMEOUT, DEFAULT_NAMESPACE, DEFAULT_POLL_HEADROOM,
    DEFAULT_POLL_INTERVAL, DEFAULT_SIDECAR_START_TIMEOUT, KUBECONFIG_ENV,
};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by all probes of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Namespace of pod targets.
    pub namespace: String,
    /// Explicit kubeconfig path.
    pub kubeconfig: Option<PathBuf>,
    /// Image of the injected debug sidecar.
    pub debug_image: String,
    /// Interval between pod re-fetches.
    pub poll_interval: Duration,
    /// Time allowed past the grace period before a container counts as stuck.
    pub poll_headroom: Duration,
    /// Time allowed for the debug sidecar to start.
    pub sidecar_start_timeout: Duration,
    /// Time allowed for the remote signal session.
    pub exec_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            kubeconfig: None,
            debug_image: DEFAULT_DEBUG_IMAGE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_headroom: DEFAULT_POLL_HEADROOM,
            sidecar_start_timeout: DEFAULT_SIDECAR_START_TIMEOUT,
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
        }
    }
}

impl ProbeSettings {
    /// Deadline for a container to terminate after being signaled.
    pub fn termination_deadline(&self, grace_period: Duration) -> Duration {
        grace_period + self.poll_headroom
    }

    /// Resolves the kubeconfig path.
    ///
    /// Order: explicit setting, `$KUBECONFIG` (first entry), `~/.kube/config`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingCredentials`] when no candidate exists.
    pub fn resolve_kubeconfig(&self) -> Result<PathBuf> {
        if let Some(path) = &self.kubeconfig {
            if path.as_os_str().is_empty() {
                return Err(Error::MissingCredentials);
            }
            return Ok(path.clone());
        }

        if let Some(paths) = std::env::var_os(KUBECONFIG_ENV) {
            if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
                return Ok(first);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".kube").join("config"))
            .ok_or(Error::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_kubeconfig_wins() {
        let settings = ProbeSettings {
            kubeconfig: Some(PathBuf::from("/etc/kube/admin.conf")),
            ..Default::default()
        };
        assert_eq!(
            settings.resolve_kubeconfig().unwrap(),
            PathBuf::from("/etc/kube/admin.conf")
        );
    }

    #[test]
    fn empty_kubeconfig_is_missing_credentials() {
        let settings = ProbeSettings {
            kubeconfig: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(matches!(
            settings.resolve_kubeconfig(),
            Err(Error::MissingCredentials)
        ));
    }

    #[test]
    fn termination_deadline_adds_headroom() {
        let settings = ProbeSettings::default();
        assert_eq!(
            settings.termination_deadline(Duration::from_secs(30)),
            Duration::from_secs(30) + DEFAULT_POLL_HEADROOM
        );
    }
}
