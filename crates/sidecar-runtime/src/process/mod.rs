//! OS process spawning for the supervised server.
//!
//! A spawned child is owned by a waiter task. Callers only get a
//! [`ChildControl`] for signalling and an ordered event stream: every
//! stdout/stderr line first, then exactly one exit event.

mod control;
mod spawner;
mod stream;

pub use control::ChildControl;
pub use spawner::TokioProcessSpawner;
pub use stream::{StreamKind, decode_line, spawn_stream_reader};
