//! # Probe Constants
//!
//! Defaults, limits, and well-known values used by the probes. These are
//! the single source of truth for the values reported in results and for
//! the bounds placed on every wait.
//!
//! ## Cross-References
//!
//! - [`crate::termination`]: Uses the signal-kill exit codes
//! - [`crate::platforms::docker`]: Uses the engine grace period default
//! - [`crate::platforms::pod`]: Uses the pod defaults and poll bounds
//! - [`crate::config`]: Seeds `ProbeSettings::default()` from these values

use std::time::Duration;

// =============================================================================
// Grace Periods
// =============================================================================

/// Grace period applied by the container engine when the container does not
/// configure a stop timeout.
pub const DOCKER_DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Grace period applied by the kubelet when the pod does not configure one.
pub const POD_DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

// =============================================================================
// Termination Facts
// =============================================================================

/// Exit codes reserved for SIGKILL.
///
/// 137 is `128 + SIGKILL` as reported by shells and container engines; 9 is
/// the raw signal number some runtimes report instead. No other code is
/// treated as a signal kill on any platform.
pub const SIGNAL_KILL_EXIT_CODES: [i64; 2] = [9, 137];

/// Termination reason the kubelet records for containers killed by the
/// out-of-memory killer.
pub const OOM_KILLED_REASON: &str = "OOMKilled";

// =============================================================================
// Display Limits
// =============================================================================

/// Maximum length of a rendered command in results.
pub const MAX_COMMAND_DISPLAY_LEN: usize = 30;

/// Marker appended to truncated commands.
pub const ELLIPSIS: &str = "...";

/// Length of a Docker short container id.
pub const DOCKER_SHORT_ID_LEN: usize = 12;

/// Length each of the pod and container names is cut to in pod result ids.
pub const POD_SHORT_NAME_LEN: usize = 7;

// =============================================================================
// Debug Sidecar
// =============================================================================

/// Image of the injected debug sidecar.
///
/// Only needs to exist; the sidecar runs nothing of its own.
pub const DEFAULT_DEBUG_IMAGE: &str = "gcr.io/distroless/static-debian11";

/// Prefix of the injected sidecar name.
pub const DEBUG_CONTAINER_PREFIX: &str = "grace-";

/// Maximum container name length (DNS-1123 label).
pub const MAX_CONTAINER_NAME_LEN: usize = 63;

/// Termination message policy of the debug sidecar.
pub const DEBUG_TERMINATION_MESSAGE_POLICY: &str = "File";

/// Sub-resource that accepts ephemeral container patches.
pub const EPHEMERAL_CONTAINERS_SUBRESOURCE: &str = "ephemeralcontainers";

/// Command run inside the sidecar to signal a sibling container.
pub const SIGNAL_COMMAND: &str = "kill";

// =============================================================================
// Polling Bounds
// =============================================================================

/// Interval between pod re-fetches while waiting on a container.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Time allowed past the grace period before a stopping container is
/// reported as stuck.
pub const DEFAULT_POLL_HEADROOM: Duration = Duration::from_secs(10);

/// Time allowed for the debug sidecar to reach the running state.
pub const DEFAULT_SIDECAR_START_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed for the remote signal session to complete.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Cluster Defaults
// =============================================================================

/// Namespace used when none is supplied.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Environment variable naming the kubeconfig file.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";
