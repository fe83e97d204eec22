//! Commands module
//! Read-only queries the page can make about the host (frontend -> host IPC)
use std::sync::Arc;

use tauri::State;

use crate::backend::BackendStatus;
use crate::config::{RunMode, ShellConfig};
use crate::desktop::SharedController;

/// Backend process state and its most recent output lines
#[tauri::command]
pub fn backend_status(controller: State<'_, SharedController>) -> BackendStatus {
    controller.lock().backend_status()
}

/// Mode the host was started in
#[tauri::command]
pub fn run_mode(config: State<'_, Arc<ShellConfig>>) -> RunMode {
    config.run_mode
}
