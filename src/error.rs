//! Error types for the stop-and-classify layer.

use std::fmt;
use std::time::Duration;

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while stopping and classifying containers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Target Errors
    // =========================================================================
    /// Unrecognized platform prefix in a container identifier.
    #[error("invalid platform '{prefix}' (expected 'docker' or 'pod')")]
    InvalidPlatformPrefix { prefix: String },

    /// Container identifier could not be parsed.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// No cluster configuration path was supplied or discoverable.
    #[error("kubeconfig is not set")]
    MissingCredentials,

    /// Platform client could not be constructed.
    #[error("failed to connect to {platform}: {reason}")]
    Connect { platform: String, reason: String },

    // =========================================================================
    // Container State Errors
    // =========================================================================
    /// Target container is not running.
    #[error("container {id} is not running")]
    NotRunning { id: String },

    /// Target container has not been marked started yet.
    #[error("container {id} did not start yet")]
    NotStarted { id: String },

    /// Pod does not exist.
    #[error("pod {namespace}/{name} not found")]
    PodNotFound { namespace: String, name: String },

    // =========================================================================
    // Platform API Errors
    // =========================================================================
    /// Reading container or pod state failed.
    #[error("error retrieving {target}: {reason}")]
    FetchFailed { target: String, reason: String },

    /// Stop request failed.
    #[error("failed to stop container '{id}': {reason}")]
    StopFailed { id: String, reason: String },

    /// Ephemeral container patch failed.
    #[error("failed to add debug container to pod '{pod}': {reason}")]
    PatchFailed { pod: String, reason: String },

    /// Ephemeral containers are disabled cluster-wide.
    #[error("ephemeral containers are disabled for this cluster (error from server: {reason:?})")]
    FeatureDisabled { reason: String },

    /// The debug sidecar of an earlier run has exited and cannot be reused.
    #[error("debug container {sidecar} in pod '{pod}' has exited; recreate the pod to stop it")]
    SidecarExited { pod: String, sidecar: String },

    /// Remote signal delivery failed.
    #[error("error shutting down container {container}: {reason}")]
    ShutdownFailed { container: String, reason: String },

    /// Waiting for a state transition exceeded its deadline.
    #[error("timed out after {duration:?} waiting for {what}")]
    PollTimeout { what: String, duration: Duration },

    /// A pod stop failed part-way through its containers.
    #[error("stopping pod '{pod}' aborted after stopping [{}]: {source}", .stopped.join(", "))]
    PodStopAborted {
        pod: String,
        stopped: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Raw failure reported by a platform client.
///
/// Both the engine and the cluster clients report failures in this shape so
/// the probes can branch on status codes without depending on client crates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code, when the server answered.
    pub code: Option<u16>,
    /// Machine-readable reason (`NotFound`, `BadRequest`, ...), possibly empty.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Creates an error returned by the server.
    pub fn status(code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Creates an error that never reached the server.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: String::new(),
            message: message.into(),
        }
    }

    /// Returns true for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.code == Some(404)
    }

    /// Returns true when the server did not recognize the submitted kind.
    ///
    /// The kind used for the `ephemeralcontainers` sub-resource changed in
    /// Kubernetes 1.22; older servers answer the typed patch this way.
    pub fn is_kind_not_registered(&self) -> bool {
        self.message.contains("not registered")
            || self.message.contains("is registered for version")
    }

    /// Returns true when a 404 refers to a missing sub-resource rather than a
    /// missing pod.
    ///
    /// A missing pod names the pod in its message; a missing
    /// `ephemeralcontainers` sub-resource carries no object detail.
    pub fn is_subresource_missing(&self, pod: &str) -> bool {
        self.is_not_found()
            && self.reason == "NotFound"
            && !self.message.contains(&format!("\"{pod}\""))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) if self.reason.is_empty() => write!(f, "{} ({})", self.message, code),
            Some(code) => write!(f, "{} ({} {})", self.message, code, self.reason),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiError {}
