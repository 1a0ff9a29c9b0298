//! # grace
//!
//! **Graceful Termination Checker for Containers**
//!
//! This crate stops running containers and reports whether they terminated
//! gracefully: whether the process received the stop signal and exited on
//! its own within the grace period, or had to be killed.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              grace                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   "web"  "docker/db"  "pod/api-7c9d"                                │
//! │      │        │             │                                       │
//! │      ▼        ▼             ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────┐       │
//! │  │              Target::parse → Probe::connect              │       │
//! │  └──────────────────────────────────────────────────────────┘       │
//! │                 │                          │                        │
//! │  ┌──────────────┴─────────┐   ┌────────────┴──────────────────┐     │
//! │  │      DockerProbe       │   │           PodProbe            │     │
//! │  │  inspect → stop (timed)│   │ inject debug sidecar          │     │
//! │  │  → inspect             │   │ kill via exec → poll status   │     │
//! │  └──────────────┬─────────┘   └────────────┬──────────────────┘     │
//! │                 └─────────────┬────────────┘                        │
//! │                               ▼                                     │
//! │               [ProbeResult] ── classify ──▶ TerminationOutcome      │
//! │                               │                                     │
//! │                               ▼                                     │
//! │                        report::write_table                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Termination Outcomes
//!
//! | Outcome         | Meaning                                                   |
//! |-----------------|-----------------------------------------------------------|
//! | GracefulSuccess | Exited 0                                                  |
//! | GracefulError   | Exited non-zero on its own                                |
//! | ForceKilled     | Killed (9/137) after the grace period expired             |
//! | OOMKilled       | Killed by the out-of-memory killer                        |
//! | Unhandled       | Exited 9/137 before the grace period expired, without OOM |
//!
//! # Pod Requirements
//!
//! Pods are stopped through an injected ephemeral container that signals its
//! siblings, so the pod must set `shareProcessNamespace: true` and the
//! cluster must support ephemeral containers.
//!
//! # Example
//!
//! ```rust,ignore
//! use grace::{FailurePolicy, ProbeSettings, Target, report, runner};
//!
//! #[tokio::main]
//! async fn main() -> grace::Result<()> {
//!     let targets = vec![Target::parse("docker/web")?, Target::parse("pod/api-7c9d")?];
//!     let outcome = runner::run(&targets, &ProbeSettings::default(), FailurePolicy::Abort).await?;
//!     report::write_table(std::io::stdout(), &report::rows(&outcome.results))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod platforms;
pub mod probe;
pub mod report;
pub mod runner;
pub mod target;
pub mod termination;

// Re-exports
pub use config::ProbeSettings;
pub use error::{ApiError, Error, Result};
pub use probe::{
    ContainerConfig, ContainerProbe, Probe, ProbeResult, TerminationFacts, render_command,
};
pub use runner::{FailurePolicy, RunReport, TargetFailure};
pub use target::{Platform, Target};
pub use termination::{TerminationOutcome, classify};
