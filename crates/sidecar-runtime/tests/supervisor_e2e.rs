//! End-to-end supervisor runs with real probes and stand-in server scripts.
#![cfg(unix)]

mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::net::TcpListener;

use sidecar_core::{ProcessState, Settings};
use sidecar_runtime::ProcessSupervisor;

fn settings_for(port: u16, server_path: &str) -> Settings {
    Settings {
        server_path: server_path.to_string(),
        port,
        startup_timeout_ms: 1500,
        project_directory: Some(std::env::temp_dir().display().to_string()),
        ..Settings::with_defaults()
    }
}

fn record_states(supervisor: &ProcessSupervisor) -> Arc<Mutex<Vec<ProcessState>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let recorder = states.clone();
    // Kept registered for the lifetime of the supervisor
    let _ = supervisor.on_state_change(move |state| recorder.lock().unwrap().push(state));
    states
}

#[tokio::test]
async fn test_port_in_use_exit_is_reported_as_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::write_script(
        dir.path(),
        "opencode",
        "echo 'Error: Failed to start server. Is port already in use?' >&2\n\
         echo 'listen EADDRINUSE: address already in use' >&2\n\
         exit 7",
    );
    let port = common::free_port().await;
    let supervisor =
        ProcessSupervisor::local(settings_for(port, &server.display().to_string())).unwrap();
    let states = record_states(&supervisor);

    let started = Instant::now();
    assert!(!supervisor.start().await);

    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(supervisor.state(), ProcessState::Error);
    let error = supervisor.last_error().unwrap();
    assert!(error.contains("exit code 7"), "{error}");
    assert!(error.contains(&format!("port {port} is already in use")), "{error}");
    assert!(!error.contains("failed to start within"), "{error}");
    assert_eq!(
        *states.lock().unwrap(),
        vec![ProcessState::Starting, ProcessState::Error]
    );
}

#[tokio::test]
async fn test_unresponsive_server_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::write_script(dir.path(), "opencode", "exec sleep 30");
    let port = common::free_port().await;
    let supervisor =
        ProcessSupervisor::local(settings_for(port, &server.display().to_string())).unwrap();

    let started = Instant::now();
    assert!(!supervisor.start().await);
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(4000), "{elapsed:?}");
    assert_eq!(
        supervisor.last_error().as_deref(),
        Some("Server failed to start within 1500ms")
    );
    assert_eq!(supervisor.pid(), None);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_foreign_listener_blocks_spawn() {
    // Never answers HTTP, so only the raw connect sees it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let supervisor =
        ProcessSupervisor::local(settings_for(port, "/nonexistent/sidecar-test/opencode")).unwrap();

    assert!(!supervisor.start().await);

    let error = supervisor.last_error().unwrap();
    // A spawn attempt would have reported the missing executable instead
    assert!(
        error.starts_with(&format!("Port {port} is already in use by another process")),
        "{error}"
    );
}

#[tokio::test]
async fn test_healthy_server_is_adopted() {
    let port = common::spawn_http_server(200).await;
    let supervisor =
        ProcessSupervisor::local(settings_for(port, "/nonexistent/sidecar-test/opencode")).unwrap();

    assert!(supervisor.start().await);
    assert_eq!(supervisor.state(), ProcessState::Running);
    assert_eq!(supervisor.url(), format!("http://127.0.0.1:{port}"));

    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::Stopped);
}

#[tokio::test]
async fn test_missing_executable() {
    let port = common::free_port().await;
    let supervisor =
        ProcessSupervisor::local(settings_for(port, "/nonexistent/sidecar-test/opencode")).unwrap();

    assert!(!supervisor.start().await);
    assert_eq!(
        supervisor.last_error().as_deref(),
        Some("Executable not found at '/nonexistent/sidecar-test/opencode'")
    );
}
