use std::sync::Arc;
#[cfg(unix)]
use std::thread;
use std::time::Duration;

use tauri::AppHandle;
use tauri_plugin_shell::process::{CommandChild, CommandEvent};
use tauri_plugin_shell::ShellExt;

use super::supervisor::{BackendChild, BackendCommand, ProcessEvent, ProcessSpawner};

/// Receives process events tagged with the generation they belong to.
pub type EventSink = Arc<dyn Fn(u64, ProcessEvent) + Send + Sync>;

/// Spawns the backend through the shell plugin with piped stdio.
pub struct ShellSpawner {
    app: AppHandle,
    sink: EventSink,
    grace: Duration,
}

impl ShellSpawner {
    pub fn new(app: AppHandle, sink: EventSink, grace: Duration) -> Self {
        Self { app, sink, grace }
    }
}

impl ProcessSpawner for ShellSpawner {
    type Child = ShellChild;

    fn spawn(&mut self, command: &BackendCommand, generation: u64) -> Result<ShellChild, String> {
        let (mut rx, child) = self
            .app
            .shell()
            .command(&command.program)
            .args(&command.args)
            .spawn()
            .map_err(|e| e.to_string())?;

        // Forward stream events; the receiver closes once the process is gone.
        let sink = self.sink.clone();
        tauri::async_runtime::spawn(async move {
            while let Some(event) = rx.recv().await {
                let event = match event {
                    CommandEvent::Stdout(bytes) => {
                        ProcessEvent::Stdout(String::from_utf8_lossy(&bytes).to_string())
                    }
                    CommandEvent::Stderr(bytes) => {
                        ProcessEvent::Stderr(String::from_utf8_lossy(&bytes).to_string())
                    }
                    CommandEvent::Error(message) => ProcessEvent::Error(message),
                    CommandEvent::Terminated(payload) => ProcessEvent::Exited(payload.code),
                    _ => continue,
                };
                sink(generation, event);
            }
        });

        Ok(ShellChild {
            child,
            grace: self.grace,
        })
    }
}

pub struct ShellChild {
    child: CommandChild,
    grace: Duration,
}

impl BackendChild for ShellChild {
    fn pid(&self) -> u32 {
        self.child.pid()
    }

    fn terminate(self) {
        let pid = self.child.pid();

        // Ask politely first, then force after the grace period without
        // holding up the caller.
        #[cfg(unix)]
        {
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
            let ShellChild { child, grace } = self;
            thread::spawn(move || {
                thread::sleep(grace);
                if let Err(e) = child.kill() {
                    log::debug!("[Backend] Forced kill of pid {} skipped: {}", pid, e);
                }
            });
        }

        #[cfg(not(unix))]
        {
            let _ = self.grace;
            if let Err(e) = self.child.kill() {
                log::warn!("[Backend] Failed to kill pid {}: {}", pid, e);
            }
        }
    }
}
