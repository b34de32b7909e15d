//! Port definitions (trait abstractions) for external systems.
//!
//! The supervisor only ever touches the network and the OS through these
//! traits, so tests can substitute deterministic fakes.
//!
//! # Design Rules
//!
//! - No reqwest/tokio-process types in any signature
//! - Probes answer with a boolean and never error
//! - Process control is bound to one specific spawned process

pub mod probe;
pub mod process;

pub use probe::{HealthProbe, PortProbe};
pub use process::{
    ExitInfo, ProcessControl, ProcessError, ProcessEvent, ProcessSpawner, SpawnError,
    SpawnRequest, SpawnedProcess,
};
