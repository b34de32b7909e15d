//! Supervisor lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the supervised server process.
///
/// Exactly one value is current at any instant. The embedding UI only ever
/// sees these four values; the reason for a transition travels separately
/// through the supervisor's last error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// No process is supervised. Initial state.
    #[default]
    Stopped,
    /// A start attempt is in flight.
    Starting,
    /// The server answered its health endpoint.
    Running,
    /// The last start attempt failed; see the last error for details.
    Error,
}

impl ProcessState {
    /// Whether a start attempt should be treated as a no-op in this state.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
