//! Core domain types and port definitions for sidecar.
//!
//! Everything here is free of process and network implementation details:
//! the lifecycle [`ProcessState`], [`Settings`] and their persistence paths,
//! the [`SupervisorError`] taxonomy, stderr diagnostics, ordered state
//! subscribers and the [`ports`] the runtime implements.
#![deny(unused_crate_dependencies)]

pub mod diagnostics;
pub mod error;
pub mod paths;
pub mod ports;
pub mod settings;
pub mod state;
pub mod subscribers;

pub use diagnostics::{ExitReport, StderrBuffer};
pub use error::SupervisorError;
pub use paths::PathError;
pub use ports::{
    ExitInfo, HealthProbe, PortProbe, ProcessControl, ProcessError, ProcessEvent, ProcessSpawner,
    SpawnError, SpawnRequest, SpawnedProcess,
};
pub use settings::{
    DEFAULT_CORS_ORIGIN, DEFAULT_HOSTNAME, DEFAULT_PORT, DEFAULT_SERVER_PATH,
    DEFAULT_STARTUP_TIMEOUT_MS, HEALTH_PATH, Settings, SettingsError, SettingsUpdate,
    validate_settings,
};
pub use state::ProcessState;
pub use subscribers::{StateSubscribers, Subscription};

// Only used by unit tests
#[cfg(test)]
use tempfile as _;
