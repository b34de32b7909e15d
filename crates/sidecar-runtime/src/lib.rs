//! Process runtime and OS-level concerns for sidecar.
//!
//! Implements the ports defined in `sidecar-core` and builds the
//! [`ProcessSupervisor`] on top of them:
//!
//! - [`probe`]: reqwest health probe and TCP port probe
//! - [`process`]: `tokio::process` spawner with lossy line readers
//! - [`shutdown`]: SIGTERM → SIGKILL escalation bound to one process
//! - [`supervisor`]: the start/stop state machine
#![deny(unsafe_code)]

pub mod probe;
pub mod process;
pub mod shutdown;
pub mod supervisor;

pub use probe::{HttpHealthProbe, TcpPortProbe};
pub use process::{ChildControl, TokioProcessSpawner};
pub use shutdown::{FORCE_KILL_GRACE, ForceKillTimer, terminate_gracefully};
pub use supervisor::{
    HEALTH_PROBE_TIMEOUT, PORT_PROBE_TIMEOUT, POLL_INTERVAL, ProcessSupervisor, Readiness,
    wait_until_ready,
};
