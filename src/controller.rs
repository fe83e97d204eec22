use std::sync::Arc;

use serde::Serialize;

use crate::backend::{BackendStatus, BackendSupervisor, ProcessEvent, ProcessSpawner, StartOutcome};
use crate::config::ShellConfig;
use crate::menu::{DispatchOutcome, MenuAction, MenuDispatcher, MenuGroup};
use crate::window::{WindowFactory, WindowManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Starting,
    Ready,
    Running,
    ShuttingDown,
    Terminated,
}

/// Whether the host keeps running when no window is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Quit,
    StayResident,
}

/// Wires the backend, window and menu to application lifecycle events. All
/// handlers are expected to run one at a time.
pub struct AppController<S: ProcessSpawner, F: WindowFactory> {
    config: Arc<ShellConfig>,
    state: LifecycleState,
    backend: BackendSupervisor<S>,
    windows: WindowManager<F>,
    menu: MenuDispatcher,
}

impl<S: ProcessSpawner, F: WindowFactory> AppController<S, F> {
    pub fn new(
        config: Arc<ShellConfig>,
        backend: BackendSupervisor<S>,
        windows: WindowManager<F>,
    ) -> Self {
        Self {
            config,
            state: LifecycleState::Starting,
            backend,
            windows,
            menu: MenuDispatcher::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn backend(&self) -> &BackendSupervisor<S> {
        &self.backend
    }

    pub fn windows(&self) -> &WindowManager<F> {
        &self.windows
    }

    fn is_shutting_down(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::ShuttingDown | LifecycleState::Terminated
        )
    }

    /// Application ready: window, then menu, then backend.
    ///
    /// Returns `Quit` when the main window could not be created on a platform
    /// that has no activation event to retry it from.
    pub fn on_ready<I>(&mut self, install_menu: I) -> ExitDecision
    where
        I: FnOnce(&[MenuGroup]) -> Result<(), String>,
    {
        if self.state != LifecycleState::Starting {
            log::warn!("[App] Ready signal in state {:?}, ignoring", self.state);
            return ExitDecision::StayResident;
        }
        log::info!("[App] Starting in {:?} mode", self.config.run_mode);

        if let Err(e) = self.windows.create_main_window() {
            if !self.config.resident_when_windowless {
                log::error!("[App] {} - quitting", e);
                self.shut_down();
                return ExitDecision::Quit;
            }
            log::error!("[App] {} - will retry on next activation", e);
        }

        if let Err(e) = self.menu.install(install_menu) {
            log::error!("[App] Failed to install application menu: {}", e);
        }

        if let StartOutcome::Failed(_) = self.backend.start() {
            log::warn!("[App] Running without a live backend; analysis requests will fail");
        }

        self.state = LifecycleState::Ready;
        ExitDecision::StayResident
    }

    /// Page content finished loading.
    pub fn on_window_ready(&mut self) {
        if self.windows.on_ready_to_show() && self.state == LifecycleState::Ready {
            self.state = LifecycleState::Running;
        }
    }

    /// OS re-activation. Recreates the window if needed; never restarts the
    /// backend and never rebuilds the menu.
    pub fn on_activate(&mut self) {
        if self.is_shutting_down() || self.state == LifecycleState::Starting {
            return;
        }
        if let Err(e) = self.windows.activate() {
            log::error!("[App] {}", e);
        }
        self.state = LifecycleState::Running;
    }

    pub fn on_window_closed(&mut self) {
        self.windows.on_closed();
    }

    pub fn on_all_windows_closed(&mut self) -> ExitDecision {
        if self.config.resident_when_windowless {
            log::info!("[App] All windows closed, staying resident");
            return ExitDecision::StayResident;
        }
        log::info!("[App] All windows closed, quitting");
        self.shut_down();
        ExitDecision::Quit
    }

    pub fn on_before_quit(&mut self) {
        self.shut_down();
    }

    pub fn on_exit(&mut self) {
        self.shut_down();
        self.state = LifecycleState::Terminated;
        log::info!("[App] Terminated");
    }

    pub fn on_menu(&mut self, action: MenuAction) -> DispatchOutcome {
        self.menu.dispatch(action, &mut self.windows)
    }

    pub fn on_backend_event(&mut self, generation: u64, event: ProcessEvent) {
        self.backend.handle_event(generation, event);
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.backend.status()
    }

    fn shut_down(&mut self) {
        if !self.is_shutting_down() {
            self.state = LifecycleState::ShuttingDown;
        }
        self.backend.stop();
    }
}
