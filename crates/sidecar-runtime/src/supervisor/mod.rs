//! Supervisor for the locally spawned server process.
//!
//! The `ProcessSupervisor` owns the state machine, the child handle, health
//! polling and shutdown escalation. Hosts call methods on it and subscribe to
//! state changes without holding any process state themselves.
//!
//! Key design decisions:
//! - **Generations**: every `start()` takes a fresh generation and `stop()`
//!   advances it, so an attempt that resolves after a stop observes the change
//!   and backs off without touching state
//! - **Tagged exits**: exit events carry the generation of the process that
//!   produced them; an exit from an earlier cycle never mutates the current one
//! - **No lock across awaits or listeners**: state lives behind a
//!   `std::sync::Mutex` that is released before subscribers are notified

mod readiness;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sidecar_core::paths;
use sidecar_core::ports::{
    ExitInfo, HealthProbe, PortProbe, ProcessControl, ProcessEvent, ProcessSpawner, SpawnRequest,
};
use sidecar_core::{
    ProcessState, Settings, StateSubscribers, StderrBuffer, Subscription, SupervisorError,
};

use crate::probe::{HttpHealthProbe, TcpPortProbe};
use crate::process::TokioProcessSpawner;
use crate::shutdown::{FORCE_KILL_GRACE, ForceKillTimer, terminate_gracefully};

pub use readiness::{HEALTH_PROBE_TIMEOUT, POLL_INTERVAL, Readiness, wait_until_ready};

/// Limit for the pre-spawn port-contention probe.
pub const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// The live child of one generation.
#[derive(Clone)]
struct ActiveProcess {
    generation: u64,
    control: Arc<dyn ProcessControl>,
    exited: CancellationToken,
}

/// Stderr and exit code captured during one start attempt.
#[derive(Debug, Default)]
struct AttemptDiagnostics {
    stderr: StderrBuffer,
    exit_code: Option<i32>,
}

type Diagnostics = Arc<Mutex<AttemptDiagnostics>>;

struct Inner {
    state: ProcessState,
    last_error: Option<String>,
    settings: Settings,
    generation: u64,
    /// Cancelled by `stop()` to abandon the in-flight attempt.
    attempt: CancellationToken,
    process: Option<ActiveProcess>,
    pending_kills: Vec<ForceKillTimer>,
}

impl Inner {
    /// Set `state`, returning it if this was an actual change.
    fn transition(&mut self, state: ProcessState) -> Option<ProcessState> {
        if self.state == state {
            return None;
        }
        self.state = state;
        Some(state)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Terminate the tracked process if it belongs to `generation`.
    fn release_process(&mut self, generation: u64) {
        if !self
            .process
            .as_ref()
            .is_some_and(|p| p.generation == generation)
        {
            return;
        }
        if let Some(process) = self.process.take() {
            self.terminate(process.control, process.exited);
        }
    }

    fn terminate(&mut self, control: Arc<dyn ProcessControl>, exited: CancellationToken) {
        self.pending_kills.retain(|timer| !timer.is_finished());
        if let Some(timer) = terminate_gracefully(control, exited, FORCE_KILL_GRACE) {
            self.pending_kills.push(timer);
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    subscribers: StateSubscribers,
    health: Arc<dyn HealthProbe>,
    port_probe: Arc<dyn PortProbe>,
    spawner: Arc<dyn ProcessSpawner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: Option<ProcessState>) {
        if let Some(state) = change {
            info!(%state, "Server state changed");
            self.subscribers.notify(state);
        }
    }

    /// Exit observed for the process of `generation`.
    fn process_exited(&self, generation: u64, info: ExitInfo) {
        let change = {
            let mut inner = self.lock();
            if inner
                .process
                .as_ref()
                .is_some_and(|p| p.generation == generation)
            {
                inner.process = None;
            }

            if inner.is_current(generation) && inner.state == ProcessState::Running {
                warn!(
                    generation,
                    code = ?info.code,
                    signal = ?info.signal,
                    "Server process exited unexpectedly"
                );
                inner.transition(ProcessState::Stopped)
            } else {
                debug!(generation, code = ?info.code, signal = ?info.signal, "Server process exited");
                None
            }
        };
        self.notify(change);
    }
}

/// Supervises one locally spawned server process.
///
/// Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```ignore
/// let supervisor = ProcessSupervisor::local(settings)?;
/// let _sub = supervisor.on_state_change(|state| println!("{state}"));
/// if supervisor.start().await {
///     println!("Serving at {}", supervisor.url());
/// }
/// supervisor.shutdown().await;
/// ```
#[derive(Clone)]
pub struct ProcessSupervisor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("ProcessSupervisor")
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .field("pid", &inner.process.as_ref().and_then(|p| p.control.pid()))
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Create a supervisor with injected probes and spawner.
    pub fn new(
        settings: Settings,
        health: Arc<dyn HealthProbe>,
        port_probe: Arc<dyn PortProbe>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ProcessState::Stopped,
                    last_error: None,
                    settings,
                    generation: 0,
                    attempt: CancellationToken::new(),
                    process: None,
                    pending_kills: Vec::new(),
                }),
                subscribers: StateSubscribers::new(),
                health,
                port_probe,
                spawner,
            }),
        }
    }

    /// Create a supervisor backed by real HTTP, TCP and `tokio::process`.
    pub fn local(settings: Settings) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            settings,
            Arc::new(HttpHealthProbe::new()?),
            Arc::new(TcpPortProbe),
            Arc::new(TokioProcessSpawner),
        ))
    }

    /// Current state.
    pub fn state(&self) -> ProcessState {
        self.shared.lock().state
    }

    /// Message explaining the last failed start, if any.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// Root URL of the server for the current settings.
    pub fn url(&self) -> String {
        self.shared.lock().settings.server_url()
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.shared.lock().settings.clone()
    }

    /// OS process id of the supervised child, if one is tracked.
    pub fn pid(&self) -> Option<u32> {
        self.shared
            .lock()
            .process
            .as_ref()
            .and_then(|p| p.control.pid())
    }

    /// Replace the settings used by the next `start()`.
    ///
    /// A process that is already running keeps its configuration.
    pub fn update_settings(&self, settings: Settings) {
        self.shared.lock().settings = settings;
    }

    /// Replace the project directory used by the next `start()`.
    pub fn update_project_directory(&self, directory: Option<String>) {
        self.shared.lock().settings.project_directory = directory;
    }

    /// Register a state-change listener.
    ///
    /// Listeners run synchronously in registration order and may call back
    /// into the supervisor.
    pub fn on_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ProcessState) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(listener)
    }

    /// Start the server and wait until it is healthy or the attempt fails.
    ///
    /// Returns `true` when the server is running, including when it already
    /// was or an attempt is already in flight. Returns `false` when the
    /// attempt failed (see [`last_error`](Self::last_error)) or was
    /// superseded by [`stop`](Self::stop).
    pub async fn start(&self) -> bool {
        let (generation, settings, abandoned, change) = {
            let mut inner = self.shared.lock();
            if inner.state.is_active() {
                debug!(state = %inner.state, "Start requested while already active");
                return true;
            }
            inner.generation += 1;
            inner.last_error = None;
            inner.attempt = CancellationToken::new();
            let change = inner.transition(ProcessState::Starting);
            (
                inner.generation,
                inner.settings.clone(),
                inner.attempt.clone(),
                change,
            )
        };
        self.shared.notify(change);
        info!(generation, url = %settings.server_url(), "Starting server");

        let diagnostics = Diagnostics::default();
        match self
            .launch(generation, &settings, &abandoned, &diagnostics)
            .await
        {
            Ok(Launch::AlreadyRunning) => self
                .finish_running(generation, None)
                .unwrap_or_default(),
            Ok(Launch::Spawned(process)) => {
                let readiness = wait_until_ready(
                    self.shared.health.as_ref(),
                    &settings.health_url(),
                    &process.exited,
                    &abandoned,
                    settings.startup_timeout(),
                )
                .await;
                self.resolve_spawned(generation, &settings, &process, readiness, &diagnostics)
            }
            Ok(Launch::Superseded) => false,
            Err(e) => self.fail(generation, &e),
        }
    }

    /// Stop the server.
    ///
    /// Sends a graceful termination signal, marks the state `Stopped` at once
    /// and arms a forceful kill in case the signal is ignored. Any in-flight
    /// `start()` is abandoned and resolves to `false`. Must be called from
    /// within a tokio runtime for the escalation to be deferred.
    pub fn stop(&self) {
        let change = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.attempt.cancel();
            if let Some(process) = inner.process.take() {
                info!(pid = ?process.control.pid(), "Stopping server");
                inner.terminate(process.control, process.exited);
            }
            inner.transition(ProcessState::Stopped)
        };
        self.shared.notify(change);
    }

    /// Stop the server and wait for every pending escalation to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let timers = std::mem::take(&mut self.shared.lock().pending_kills);
        for timer in timers {
            timer.wait().await;
        }
    }

    /// Run the pre-spawn checks and spawn the server.
    ///
    /// Nothing is spawned once `abandoned` has fired or the generation has
    /// moved on.
    async fn launch(
        &self,
        generation: u64,
        settings: &Settings,
        abandoned: &CancellationToken,
        diagnostics: &Diagnostics,
    ) -> Result<Launch, SupervisorError> {
        if settings
            .project_directory
            .as_deref()
            .is_none_or(|dir| dir.trim().is_empty())
        {
            return Err(SupervisorError::MissingProjectDirectory);
        }

        let health_url = settings.health_url();
        let healthy = tokio::select! {
            healthy = self
                .shared
                .health
                .probe_health(&health_url, HEALTH_PROBE_TIMEOUT) => healthy,
            () = abandoned.cancelled() => return Ok(Launch::Superseded),
        };
        if healthy {
            info!(url = %settings.server_url(), "Server already running, reusing it");
            return Ok(Launch::AlreadyRunning);
        }

        let port_in_use = tokio::select! {
            in_use = self
                .shared
                .port_probe
                .probe_tcp(&settings.hostname, settings.port, PORT_PROBE_TIMEOUT) => in_use,
            () = abandoned.cancelled() => return Ok(Launch::Superseded),
        };
        if port_in_use {
            return Err(SupervisorError::PortConflict {
                port: settings.port,
            });
        }

        let working_dir = paths::home_dir().map_err(|_| SupervisorError::HomeDirUnavailable)?;
        let request = SpawnRequest::serve(settings, working_dir);

        // Held across spawn and registration so a concurrent stop() either
        // prevents the spawn or finds the process to terminate.
        let mut inner = self.shared.lock();
        if abandoned.is_cancelled() || !inner.is_current(generation) {
            debug!(generation, "Attempt superseded before spawn");
            return Ok(Launch::Superseded);
        }
        let spawned = self.shared.spawner.spawn(&request)?;

        let process = ActiveProcess {
            generation,
            control: spawned.control,
            exited: CancellationToken::new(),
        };
        inner.process = Some(process.clone());
        drop(inner);

        tokio::spawn(pump_events(
            Arc::downgrade(&self.shared),
            generation,
            spawned.events,
            Arc::clone(diagnostics),
            process.exited.clone(),
        ));

        Ok(Launch::Spawned(process))
    }

    /// Settle a spawned attempt once the readiness race is over.
    fn resolve_spawned(
        &self,
        generation: u64,
        settings: &Settings,
        process: &ActiveProcess,
        readiness: Readiness,
        diagnostics: &Diagnostics,
    ) -> bool {
        if readiness == Readiness::Ready {
            if let Some(started) = self.finish_running(generation, Some(process)) {
                return started;
            }
        }

        let error = {
            // Sampled before cleanup so our own SIGTERM never reads as a crash
            let exited = process.exited.is_cancelled();
            let diagnostics = diagnostics.lock().unwrap_or_else(PoisonError::into_inner);
            SupervisorError::startup_failure(
                diagnostics.exit_code,
                exited,
                settings.port,
                &diagnostics.stderr,
                settings.startup_timeout(),
            )
        };
        self.fail(generation, &error)
    }

    /// Move the attempt of `generation` to `Running`.
    ///
    /// Returns `None` if the attempt's process exited after answering its
    /// health check but before the transition.
    fn finish_running(&self, generation: u64, process: Option<&ActiveProcess>) -> Option<bool> {
        let change = {
            let mut inner = self.shared.lock();
            if !inner.is_current(generation) {
                debug!(generation, "Attempt superseded before it became ready");
                return Some(false);
            }
            if process.is_some()
                && !inner
                    .process
                    .as_ref()
                    .is_some_and(|p| p.generation == generation)
            {
                return None;
            }
            inner.transition(ProcessState::Running)
        };
        info!(generation, pid = ?process.and_then(|p| p.control.pid()), "Server is ready");
        self.shared.notify(change);
        Some(true)
    }

    /// Move the attempt of `generation` to `Error`, terminating its process.
    fn fail(&self, generation: u64, error: &SupervisorError) -> bool {
        let change = {
            let mut inner = self.shared.lock();
            if !inner.is_current(generation) {
                debug!(generation, %error, "Attempt superseded, discarding its failure");
                return false;
            }
            inner.release_process(generation);
            inner.last_error = Some(error.to_string());
            inner.transition(ProcessState::Error)
        };
        error!(generation, %error, "Server failed to start");
        self.shared.notify(change);
        false
    }
}

/// Result of the pre-spawn phase.
enum Launch {
    /// A healthy server already answers on the configured URL.
    AlreadyRunning,
    /// A new child was spawned and is being tracked.
    Spawned(ActiveProcess),
    /// `stop()` ran before the spawn; nothing was started.
    Superseded,
}

/// Log the child's output, capture stderr for diagnostics, and report its exit.
async fn pump_events(
    shared: Weak<Shared>,
    generation: u64,
    mut events: UnboundedReceiver<ProcessEvent>,
    diagnostics: Diagnostics,
    exited: CancellationToken,
) {
    let mut exit = ExitInfo::default();
    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Stdout(line) => info!(generation, stream = "stdout", "{}", line),
            ProcessEvent::Stderr(line) => {
                warn!(generation, stream = "stderr", "{}", line);
                diagnostics
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .stderr
                    .push(line);
            }
            ProcessEvent::Exited(info) => {
                exit = info;
                break;
            }
        }
    }

    if let Some(code) = exit.failure_code() {
        diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .exit_code = Some(code);
    }
    exited.cancel();

    if let Some(shared) = shared.upgrade() {
        shared.process_exited(generation, exit);
    }
}
