use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::diagnostics::{DiagnosticBuffer, DiagnosticLine, Stream};
use crate::config::{BackendConfig, ShellConfig};
use crate::error::ShellError;

/// Number of stderr lines attached to a crash report.
const CRASH_TAIL_LINES: usize = 20;

/// Program and arguments used to launch the analysis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BackendCommand {
    /// `python <resources>/backend/main.py`, with the script made absolute.
    pub fn resolve(config: &BackendConfig, resource_dir: &Path) -> Self {
        let script: PathBuf = if config.script.is_absolute() {
            config.script.clone()
        } else {
            resource_dir.join(&config.script)
        };
        Self {
            program: config.program.clone(),
            args: vec![script.to_string_lossy().to_string()],
        }
    }
}

/// Everything the backend process can tell us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    Error(String),
    Exited(Option<i32>),
}

/// A live OS child. `terminate` is a best-effort signal and must not block.
pub trait BackendChild: Send {
    fn pid(&self) -> u32;
    fn terminate(self);
}

/// Creates backend processes. Implementations deliver the child's events back
/// through [`BackendSupervisor::handle_event`] tagged with `generation`.
pub trait ProcessSpawner {
    type Child: BackendChild;

    fn spawn(&mut self, command: &BackendCommand, generation: u64) -> Result<Self::Child, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Exited { code: Option<i32> },
}

pub struct BackendProcessHandle<C> {
    generation: u64,
    pid: u32,
    child: Option<C>,
    status: ProcessStatus,
    diagnostics: DiagnosticBuffer,
}

impl<C> BackendProcessHandle<C> {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessStatus::Running
    }

    pub fn diagnostics(&self) -> &DiagnosticBuffer {
        &self.diagnostics
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Development: the backend is managed outside the shell.
    Skipped,
    AlreadyRunning,
    Spawned { pid: u32 },
    Failed(ShellError),
}

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub managed: bool,
    pub pid: Option<u32>,
    pub status: Option<ProcessStatus>,
    pub recent: Vec<DiagnosticLine>,
}

/// Owns the one backend process handle.
pub struct BackendSupervisor<S: ProcessSpawner> {
    config: Arc<ShellConfig>,
    command: BackendCommand,
    spawner: S,
    handle: Option<BackendProcessHandle<S::Child>>,
    next_generation: u64,
}

impl<S: ProcessSpawner> BackendSupervisor<S> {
    pub fn new(config: Arc<ShellConfig>, command: BackendCommand, spawner: S) -> Self {
        Self {
            config,
            command,
            spawner,
            handle: None,
            next_generation: 1,
        }
    }

    pub fn handle(&self) -> Option<&BackendProcessHandle<S::Child>> {
        self.handle.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_running())
    }

    pub fn start(&mut self) -> StartOutcome {
        if self.config.run_mode.is_development() {
            log::info!("[Backend] Development mode - expecting an externally started backend");
            return StartOutcome::Skipped;
        }

        if let Some(handle) = self.handle.as_ref().filter(|h| h.is_running()) {
            log::debug!("[Backend] Already running (pid {}), not spawning again", handle.pid);
            return StartOutcome::AlreadyRunning;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        match self.spawner.spawn(&self.command, generation) {
            Ok(child) => {
                let pid = child.pid();
                log::info!(
                    "[Backend] Started {} {} (pid {})",
                    self.command.program,
                    self.command.args.join(" "),
                    pid
                );
                self.handle = Some(BackendProcessHandle {
                    generation,
                    pid,
                    child: Some(child),
                    status: ProcessStatus::Running,
                    diagnostics: DiagnosticBuffer::new(self.config.backend.diagnostic_lines),
                });
                StartOutcome::Spawned { pid }
            }
            Err(reason) => {
                let err = ShellError::BackendSpawnFailed {
                    program: self.command.program.clone(),
                    reason,
                };
                log::error!("[Backend] {} - continuing without a live backend", err);
                StartOutcome::Failed(err)
            }
        }
    }

    /// Request termination and forget the handle. Returns whether a signal was
    /// actually sent, so repeated calls are observable no-ops.
    pub fn stop(&mut self) -> bool {
        let Some(mut handle) = self.handle.take() else {
            return false;
        };
        match handle.child.take() {
            Some(child) => {
                log::info!("[Backend] Stopping backend (pid {})", handle.pid);
                child.terminate();
                true
            }
            None => {
                log::debug!("[Backend] Releasing handle of exited backend (pid {})", handle.pid);
                false
            }
        }
    }

    /// Apply one process event. Events from a process other than the current
    /// one are dropped. Returns the crash report when the backend died badly.
    pub fn handle_event(&mut self, generation: u64, event: ProcessEvent) -> Option<ShellError> {
        let Some(handle) = self.handle.as_mut().filter(|h| h.generation == generation) else {
            log::debug!("[Backend] Ignoring event from stale process: {:?}", event);
            return None;
        };

        match event {
            ProcessEvent::Stdout(text) => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    log::info!("[Backend] {}", line);
                    handle.diagnostics.push(Stream::Stdout, line);
                }
                None
            }
            ProcessEvent::Stderr(text) => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    log::warn!("[Backend] {}", line);
                    handle.diagnostics.push(Stream::Stderr, line);
                }
                None
            }
            ProcessEvent::Error(message) => {
                log::error!("[Backend] Stream error: {}", message);
                handle.diagnostics.push(Stream::Stderr, message);
                None
            }
            ProcessEvent::Exited(code) => {
                handle.status = ProcessStatus::Exited { code };
                // The OS side is already gone; dropping the child releases it.
                handle.child = None;
                if code == Some(0) {
                    log::info!("[Backend] Exited cleanly (pid {})", handle.pid);
                    None
                } else {
                    let err = ShellError::BackendCrashed {
                        code,
                        recent: handle.diagnostics.tail(Stream::Stderr, CRASH_TAIL_LINES),
                    };
                    log::error!("[Backend] {}", err);
                    Some(err)
                }
            }
        }
    }

    pub fn status(&self) -> BackendStatus {
        BackendStatus {
            managed: !self.config.run_mode.is_development(),
            pid: self.handle.as_ref().map(|h| h.pid),
            status: self.handle.as_ref().map(|h| h.status),
            recent: self
                .handle
                .as_ref()
                .map(|h| h.diagnostics.lines().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

impl<S: ProcessSpawner> Drop for BackendSupervisor<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RunMode;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub(crate) struct Calls {
        pub spawned: Vec<u64>,
        pub terminated: Vec<u32>,
    }

    pub(crate) struct FakeChild {
        pid: u32,
        calls: Arc<Mutex<Calls>>,
    }

    impl BackendChild for FakeChild {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn terminate(self) {
            self.calls.lock().terminated.push(self.pid);
        }
    }

    pub(crate) struct FakeSpawner {
        pub calls: Arc<Mutex<Calls>>,
        pub fail: Option<String>,
    }

    impl FakeSpawner {
        pub fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Calls::default())),
                fail: None,
            }
        }
    }

    impl ProcessSpawner for FakeSpawner {
        type Child = FakeChild;

        fn spawn(&mut self, _command: &BackendCommand, generation: u64) -> Result<FakeChild, String> {
            if let Some(reason) = &self.fail {
                return Err(reason.clone());
            }
            self.calls.lock().spawned.push(generation);
            Ok(FakeChild {
                pid: 4000 + generation as u32,
                calls: self.calls.clone(),
            })
        }
    }

    fn command() -> BackendCommand {
        BackendCommand {
            program: "python".into(),
            args: vec!["/opt/radar/resources/backend/main.py".into()],
        }
    }

    fn supervisor(mode: RunMode) -> (BackendSupervisor<FakeSpawner>, Arc<Mutex<Calls>>) {
        let config = ShellConfig {
            run_mode: mode,
            backend: BackendConfig {
                diagnostic_lines: 4,
                ..BackendConfig::default()
            },
            ..ShellConfig::default()
        };
        let spawner = FakeSpawner::new();
        let calls = spawner.calls.clone();
        (BackendSupervisor::new(Arc::new(config), command(), spawner), calls)
    }

    #[test]
    fn resolve_places_script_under_resources() {
        let cmd = BackendCommand::resolve(&BackendConfig::default(), Path::new("/opt/radar/resources"));
        assert_eq!(cmd.program, "python");
        let expected = Path::new("/opt/radar/resources").join("backend").join("main.py");
        assert_eq!(cmd.args, vec![expected.to_string_lossy().to_string()]);
    }

    #[test]
    fn development_start_is_a_no_op() {
        let (mut sup, calls) = supervisor(RunMode::Development);
        assert_eq!(sup.start(), StartOutcome::Skipped);
        assert!(sup.handle().is_none());
        assert!(calls.lock().spawned.is_empty());
        assert!(!sup.status().managed);
    }

    #[test]
    fn second_start_while_running_does_not_spawn() {
        let (mut sup, calls) = supervisor(RunMode::Production);
        assert_eq!(sup.start(), StartOutcome::Spawned { pid: 4001 });
        assert_eq!(sup.start(), StartOutcome::AlreadyRunning);
        assert_eq!(calls.lock().spawned, vec![1]);
        assert!(sup.is_running());
    }

    #[test]
    fn stop_twice_terminates_once() {
        let (mut sup, calls) = supervisor(RunMode::Production);
        sup.start();
        assert!(sup.stop());
        assert!(!sup.stop());
        assert_eq!(calls.lock().terminated, vec![4001]);
        assert!(sup.handle().is_none());
    }

    #[test]
    fn stop_without_handle_is_harmless() {
        let (mut sup, calls) = supervisor(RunMode::Production);
        assert!(!sup.stop());
        assert!(calls.lock().terminated.is_empty());
    }

    #[test]
    fn spawn_failure_is_reported_and_leaves_no_handle() {
        let (mut sup, _) = supervisor(RunMode::Production);
        sup.spawner.fail = Some("No such file or directory (os error 2)".into());
        match sup.start() {
            StartOutcome::Failed(ShellError::BackendSpawnFailed { program, reason }) => {
                assert_eq!(program, "python");
                assert!(reason.contains("os error 2"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(sup.handle().is_none());
        assert!(!sup.stop());
    }

    #[test]
    fn crash_keeps_stderr_tail_and_does_not_respawn() {
        let (mut sup, calls) = supervisor(RunMode::Production);
        sup.start();
        sup.handle_event(1, ProcessEvent::Stdout("Uvicorn running on :8000\n".into()));
        for i in 0..6 {
            sup.handle_event(1, ProcessEvent::Stderr(format!("trace {}\n", i)));
        }

        let crash = sup.handle_event(1, ProcessEvent::Exited(Some(1)));
        match crash {
            Some(ShellError::BackendCrashed { code, recent }) => {
                assert_eq!(code, Some(1));
                assert_eq!(recent, vec!["trace 2", "trace 3", "trace 4", "trace 5"]);
            }
            other => panic!("expected crash report, got {:?}", other),
        }

        let handle = sup.handle().expect("handle kept for diagnostics");
        assert_eq!(handle.status(), ProcessStatus::Exited { code: Some(1) });
        assert_eq!(handle.diagnostics().len(), 4);
        assert_eq!(calls.lock().spawned.len(), 1);

        // Already dead: stop releases the handle without signalling.
        assert!(!sup.stop());
        assert!(calls.lock().terminated.is_empty());
    }

    #[test]
    fn clean_exit_is_not_a_crash() {
        let (mut sup, _) = supervisor(RunMode::Production);
        sup.start();
        assert_eq!(sup.handle_event(1, ProcessEvent::Exited(Some(0))), None);
        assert!(!sup.is_running());
    }

    #[test]
    fn start_after_exit_spawns_a_new_generation() {
        let (mut sup, calls) = supervisor(RunMode::Production);
        sup.start();
        sup.handle_event(1, ProcessEvent::Exited(Some(1)));
        assert_eq!(sup.start(), StartOutcome::Spawned { pid: 4002 });

        // Late events from the first process must not touch the new handle.
        assert_eq!(sup.handle_event(1, ProcessEvent::Exited(Some(9))), None);
        assert!(sup.is_running());
        assert_eq!(calls.lock().spawned, vec![1, 2]);
    }

    #[test]
    fn events_after_stop_are_ignored() {
        let (mut sup, _) = supervisor(RunMode::Production);
        sup.start();
        sup.stop();
        assert_eq!(sup.handle_event(1, ProcessEvent::Exited(None)), None);
        assert!(sup.handle().is_none());
    }

    #[test]
    fn multi_line_chunks_are_split() {
        let (mut sup, _) = supervisor(RunMode::Production);
        sup.start();
        sup.handle_event(1, ProcessEvent::Stdout("a\r\nb\n\n".into()));
        let status = sup.status();
        let texts: Vec<&str> = status.recent.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a", "b"]);
        assert_eq!(status.pid, Some(4001));
        assert_eq!(status.status, Some(ProcessStatus::Running));
    }

    #[test]
    fn drop_stops_the_backend() {
        let (mut sup, calls) = supervisor(RunMode::Production);
        sup.start();
        drop(sup);
        assert_eq!(calls.lock().terminated, vec![4001]);
    }
}
