//! Termination classification.
//!
//! Turns the raw facts of a stop (exit code, OOM flag, elapsed time and the
//! grace period in force) into one of five outcomes:
//!
//! ```text
//!   exit == 0 ───────────────────────────────────▶ GracefulSuccess
//!   oom ─────────────────────────────────────────▶ OOMKilled
//!   exit ∈ {9, 137} ──┬── duration ≥ grace ──────▶ ForceKilled
//!                     └── duration <  grace ─────▶ Unhandled
//!   otherwise ───────────────────────────────────▶ GracefulError
//! ```
//!
//! The order matters: an OOM kill also surfaces as exit code 137, and the
//! OOM explanation must win over the generic force-kill one.

use crate::constants::SIGNAL_KILL_EXIT_CODES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a container died after being asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationOutcome {
    /// Terminated gracefully with exit code zero.
    GracefulSuccess,
    /// Terminated on its own but with a non-zero exit code.
    GracefulError,
    /// Failed to terminate within the grace period and was killed by the
    /// platform.
    ForceKilled,
    /// Exceeded its memory limit during shutdown and was killed.
    OOMKilled,
    /// Exited with a SIGKILL-reserved code before the grace period elapsed,
    /// without an OOM kill.
    ///
    /// Usually means the process itself exits with 9 or 137 in response to
    /// SIGTERM.
    Unhandled,
}

impl TerminationOutcome {
    /// Returns true for the two outcomes where the process handled the
    /// signal itself.
    pub fn is_graceful(&self) -> bool {
        matches!(self, Self::GracefulSuccess | Self::GracefulError)
    }

    /// Returns the outcome name as rendered in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GracefulSuccess => "GracefulSuccess",
            Self::GracefulError => "GracefulError",
            Self::ForceKilled => "ForceKilled",
            Self::OOMKilled => "OOMKilled",
            Self::Unhandled => "Unhandled",
        }
    }
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `exit_code` is one of the SIGKILL indicators.
pub fn is_signal_kill(exit_code: i64) -> bool {
    SIGNAL_KILL_EXIT_CODES.contains(&exit_code)
}

/// Classifies a stopped container.
///
/// Pure and total: every input maps to exactly one outcome.
pub fn classify(
    exit_code: i64,
    oom_killed: bool,
    stop_duration: Duration,
    grace_period: Duration,
) -> TerminationOutcome {
    if exit_code == 0 {
        return TerminationOutcome::GracefulSuccess;
    }

    if oom_killed {
        return TerminationOutcome::OOMKilled;
    }

    if is_signal_kill(exit_code) {
        if stop_duration >= grace_period {
            return TerminationOutcome::ForceKilled;
        }
        return TerminationOutcome::Unhandled;
    }

    TerminationOutcome::GracefulError
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant_name() {
        assert_eq!(TerminationOutcome::OOMKilled.to_string(), "OOMKilled");
        assert_eq!(TerminationOutcome::GracefulSuccess.to_string(), "GracefulSuccess");
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&TerminationOutcome::OOMKilled).unwrap();
        assert_eq!(json, "\"OOMKilled\"");
    }
}
