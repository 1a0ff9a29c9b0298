//! Platform probes.
//!
//! Each platform contributes a probe and a client seam:
//!
//! | Platform | Probe         | Client trait    | Client             |
//! |----------|---------------|-----------------|--------------------|
//! | Docker   | `DockerProbe` | `EngineClient`  | `BollardEngine`    |
//! | Pod      | `PodProbe`    | `PodClient`     | `KubePodClient`    |
//!
//! The probes only talk to their client trait, so they run unchanged against
//! in-memory clients in tests.

pub mod docker;
pub mod docker_engine;
pub mod kube_client;
pub mod pod;
pub mod sidecar;

pub use self::docker::{ContainerInspection, DockerProbe, EngineClient};
pub use self::docker_engine::BollardEngine;
pub use self::kube_client::KubePodClient;
pub use self::pod::{ExecOutput, PodClient, PodProbe};
pub use self::sidecar::InjectionPath;
