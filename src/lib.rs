//! Radar Shell
//! Desktop host for the radar signal analysis UI (Tauri backend + web frontend)
//!
//! Module structure:
//! - backend: analysis process supervision and output diagnostics
//! - window: the single main window and its operations
//! - navigation: egress policy for page-originated navigation and pop-ups
//! - menu: application menu description and dispatch
//! - controller: application lifecycle state machine
//! - commands: Tauri IPC handlers (frontend -> host)

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod menu;
pub mod navigation;
pub mod window;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use std::path::PathBuf;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tauri::{AppHandle, Manager, RunEvent, WindowEvent};

    use crate::backend::process::{EventSink, ShellSpawner};
    use crate::backend::{BackendCommand, BackendSupervisor};
    use crate::commands;
    use crate::config::ShellConfig;
    use crate::controller::{AppController, ExitDecision};
    use crate::menu::{self, DispatchOutcome, MenuAction};
    use crate::navigation::NavigationGuard;
    use crate::window::webview::WebviewFactory;
    use crate::window::{WindowManager, MAIN_WINDOW_LABEL};

    pub type DesktopController = AppController<ShellSpawner, WebviewFactory>;
    pub type SharedController = Arc<Mutex<DesktopController>>;

    /// Run `f` against the managed controller, if setup got that far.
    fn with_controller<T>(app: &AppHandle, f: impl FnOnce(&mut DesktopController) -> T) -> Option<T> {
        let controller = app.try_state::<SharedController>()?;
        let mut guard = controller.lock();
        Some(f(&mut guard))
    }

    fn build_controller(app: &AppHandle, config: Arc<ShellConfig>) -> SharedController {
        let resource_dir = app.path().resource_dir().unwrap_or_else(|e| {
            log::warn!("[App] Resource directory unavailable ({}), using working directory", e);
            PathBuf::from(".")
        });
        let command = BackendCommand::resolve(&config.backend, &resource_dir);

        let sink_app = app.clone();
        let sink: EventSink = Arc::new(move |generation, event| {
            with_controller(&sink_app, |c| c.on_backend_event(generation, event));
        });
        let spawner = ShellSpawner::new(app.clone(), sink, config.backend.terminate_grace());

        // `tauri dev` serves `WebviewUrl::App` from the dev server, not the
        // packaged scheme.
        let app_origin = if tauri::is_dev() {
            app.config().build.dev_url.clone()
        } else {
            None
        };

        let ready_app = app.clone();
        let factory = WebviewFactory::new(
            app.clone(),
            NavigationGuard::new(&config, app_origin.as_ref()),
            Arc::new(move || {
                with_controller(&ready_app, |c| c.on_window_ready());
            }),
        );

        Arc::new(Mutex::new(AppController::new(
            config.clone(),
            BackendSupervisor::new(config.clone(), command, spawner),
            WindowManager::new(config, factory),
        )))
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        let (config, config_error) = ShellConfig::load();
        let config = Arc::new(config);
        let setup_config = config.clone();

        tauri::Builder::default()
            .plugin(tauri_plugin_dialog::init())
            .plugin(tauri_plugin_fs::init())
            .plugin(tauri_plugin_shell::init())
            .plugin(tauri_plugin_opener::init())
            .manage(config)
            .setup(move |app| {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(setup_config.log_level())
                        .build(),
                )?;
                if let Some(e) = config_error {
                    log::warn!("[Config] Ignoring config file, using defaults: {:#}", e);
                }

                let handle = app.handle().clone();
                let controller = build_controller(&handle, setup_config.clone());
                app.manage(controller.clone());

                let decision = controller.lock().on_ready(|groups| {
                    menu::native::install(&handle, groups).map_err(|e| e.to_string())
                });
                if decision == ExitDecision::Quit {
                    handle.exit(1);
                }
                Ok(())
            })
            .on_menu_event(|app, event| {
                let Some(action) = MenuAction::from_id(event.id().as_ref()) else {
                    return;
                };
                let outcome = with_controller(app, |c| c.on_menu(action));
                // Lock released; quitting re-enters the controller via ExitRequested.
                if outcome == Some(DispatchOutcome::Quit) {
                    app.exit(0);
                }
            })
            .on_window_event(|window, event| {
                if let WindowEvent::Destroyed = event {
                    if window.label() == MAIN_WINDOW_LABEL {
                        with_controller(window.app_handle(), |c| c.on_window_closed());
                    }
                }
            })
            .invoke_handler(tauri::generate_handler![
                commands::backend_status,
                commands::run_mode,
            ])
            .build(tauri::generate_context!())
            .expect("error while building tauri application")
            .run(|app_handle, event| match event {
                RunEvent::ExitRequested { code, api, .. } => {
                    if code.is_none() {
                        // Last window closed.
                        let decision = with_controller(app_handle, |c| c.on_all_windows_closed());
                        if decision == Some(ExitDecision::StayResident) {
                            api.prevent_exit();
                        }
                    } else {
                        with_controller(app_handle, |c| c.on_before_quit());
                    }
                }
                RunEvent::Exit => {
                    log::info!("App shutting down - stopping analysis backend");
                    with_controller(app_handle, |c| c.on_exit());
                }
                #[cfg(target_os = "macos")]
                RunEvent::Reopen {
                    has_visible_windows,
                    ..
                } => {
                    if !has_visible_windows {
                        with_controller(app_handle, |c| c.on_activate());
                    }
                }
                _ => {}
            });
    }
}
