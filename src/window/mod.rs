//! The single primary window and the operations the menu performs on it.

#[cfg(feature = "desktop")]
pub mod webview;

use std::sync::Arc;

use url::Url;

use crate::config::ShellConfig;
use crate::error::ShellError;

pub const MAIN_WINDOW_LABEL: &str = "main";

const ZOOM_STEP: f64 = 0.5;
const MIN_ZOOM_LEVEL: f64 = -5.0;
const MAX_ZOOM_LEVEL: f64 = 5.0;

/// Scale factor for a zoom level; each level is 20% larger than the last.
pub fn zoom_factor(level: f64) -> f64 {
    1.2f64.powf(level)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentSource {
    DevServer(Url),
    /// Page path relative to the bundled frontend.
    Packaged(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub label: String,
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub source: ContentSource,
    pub open_devtools: bool,
}

impl WindowSpec {
    pub fn main(config: &ShellConfig) -> Result<Self, ShellError> {
        let source = if config.run_mode.is_development() {
            let url = Url::parse(&config.dev_server_url).map_err(|e| {
                ShellError::WindowCreationFailed(format!(
                    "invalid dev server URL {:?}: {}",
                    config.dev_server_url, e
                ))
            })?;
            ContentSource::DevServer(url)
        } else {
            ContentSource::Packaged(config.window.entry_page.clone())
        };
        Ok(Self {
            label: MAIN_WINDOW_LABEL.to_string(),
            title: config.window.title.clone(),
            width: config.window.width,
            height: config.window.height,
            min_width: config.window.min_width,
            min_height: config.window.min_height,
            source,
            open_devtools: config.run_mode.is_development(),
        })
    }
}

/// A renderable browsing context the shell owns.
pub trait ContentSurface {
    fn show(&self) -> Result<(), String>;
    fn reload(&self, ignore_cache: bool) -> Result<(), String>;
    fn set_zoom(&self, factor: f64) -> Result<(), String>;
    fn open_devtools(&self);
    fn close_devtools(&self);
    fn is_devtools_open(&self) -> bool;
    /// One-way, payload-free message to the page.
    fn send(&self, channel: &str) -> Result<(), String>;
}

/// Builds surfaces with the navigation guard already attached.
pub trait WindowFactory {
    type Surface: ContentSurface;

    fn create(&mut self, spec: &WindowSpec) -> Result<Self::Surface, String>;
}

/// Operations that act on the window itself rather than on page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOp {
    Reload,
    ForceReload,
    ToggleDevTools,
    ResetZoom,
    ZoomIn,
    ZoomOut,
}

pub struct WindowHandle<S> {
    surface: S,
    visible: bool,
    zoom_level: f64,
    devtools_open: bool,
}

impl<S: ContentSurface> WindowHandle<S> {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn devtools_open(&self) -> bool {
        self.devtools_open
    }

    fn set_zoom_level(&mut self, level: f64) -> Result<(), String> {
        let level = level.clamp(MIN_ZOOM_LEVEL, MAX_ZOOM_LEVEL);
        self.surface.set_zoom(zoom_factor(level))?;
        self.zoom_level = level;
        Ok(())
    }
}

/// Owns at most one main window.
pub struct WindowManager<F: WindowFactory> {
    config: Arc<ShellConfig>,
    factory: F,
    current: Option<WindowHandle<F::Surface>>,
}

impl<F: WindowFactory> WindowManager<F> {
    pub fn new(config: Arc<ShellConfig>, factory: F) -> Self {
        Self {
            config,
            factory,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&WindowHandle<F::Surface>> {
        self.current.as_ref()
    }

    pub fn has_window(&self) -> bool {
        self.current.is_some()
    }

    #[cfg(test)]
    pub(crate) fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Create the hidden main window. Returns `Ok(false)` if one already exists.
    pub fn create_main_window(&mut self) -> Result<bool, ShellError> {
        if self.current.is_some() {
            log::debug!("[Window] Main window already exists");
            return Ok(false);
        }

        let spec = WindowSpec::main(&self.config)?;
        let surface = self
            .factory
            .create(&spec)
            .map_err(ShellError::WindowCreationFailed)?;

        if spec.open_devtools {
            surface.open_devtools();
        }
        log::info!(
            "[Window] Created main window {}x{} ({:?})",
            spec.width,
            spec.height,
            spec.source
        );

        self.current = Some(WindowHandle {
            surface,
            visible: false,
            zoom_level: 0.0,
            devtools_open: spec.open_devtools,
        });
        Ok(true)
    }

    /// OS re-activation: recreate the window only when none is open.
    pub fn activate(&mut self) -> Result<bool, ShellError> {
        if self.current.is_some() {
            return Ok(false);
        }
        log::info!("[Window] Activated without a window - recreating");
        self.create_main_window()
    }

    /// Content finished loading. The first call shows the window; later page
    /// loads (reloads) leave it alone. Returns whether the window was shown.
    pub fn on_ready_to_show(&mut self) -> bool {
        let dev = self.config.run_mode.is_development();
        let Some(handle) = self.current.as_mut() else {
            return false;
        };
        if handle.visible {
            return false;
        }
        if let Err(e) = handle.surface.show() {
            log::error!("[Window] Failed to show main window: {}", e);
            return false;
        }
        handle.visible = true;

        if dev && !handle.surface.is_devtools_open() {
            handle.surface.open_devtools();
        }
        handle.devtools_open = handle.surface.is_devtools_open();
        true
    }

    /// The window is gone; drop the handle so `activate` can recreate it.
    pub fn on_closed(&mut self) {
        if self.current.take().is_some() {
            log::info!("[Window] Main window closed");
        }
    }

    /// Returns `false` when there is no window to act on.
    pub fn apply(&mut self, op: WindowOp) -> bool {
        let Some(handle) = self.current.as_mut() else {
            log::debug!("[Window] {:?} ignored, no window", op);
            return false;
        };

        let result = match op {
            WindowOp::Reload => handle.surface.reload(false),
            WindowOp::ForceReload => handle.surface.reload(true),
            WindowOp::ToggleDevTools => {
                if handle.surface.is_devtools_open() {
                    handle.surface.close_devtools();
                } else {
                    handle.surface.open_devtools();
                }
                handle.devtools_open = handle.surface.is_devtools_open();
                Ok(())
            }
            WindowOp::ResetZoom => handle.set_zoom_level(0.0),
            WindowOp::ZoomIn => handle.set_zoom_level(handle.zoom_level + ZOOM_STEP),
            WindowOp::ZoomOut => handle.set_zoom_level(handle.zoom_level - ZOOM_STEP),
        };

        if let Err(e) = result {
            log::warn!("[Window] {:?} failed: {}", op, e);
        }
        true
    }

    /// Send a payload-free message to the page. Dropped when there is no window.
    pub fn send(&self, channel: &str) -> bool {
        let Some(handle) = self.current.as_ref() else {
            log::debug!("[Window] No window, dropping {}", channel);
            return false;
        };
        if let Err(e) = handle.surface.send(channel) {
            log::warn!("[Window] Failed to send {}: {}", channel, e);
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RunMode;
    use parking_lot::Mutex;

    /// Shared log of what the fake surfaces were asked to do.
    #[derive(Default)]
    pub(crate) struct SurfaceLog {
        pub created: Vec<WindowSpec>,
        pub shown: usize,
        pub reloads: Vec<bool>,
        pub zoom: Vec<f64>,
        pub devtools_opened: usize,
        pub devtools_open: bool,
        pub sent: Vec<String>,
    }

    pub(crate) struct FakeSurface {
        log: Arc<Mutex<SurfaceLog>>,
    }

    impl ContentSurface for FakeSurface {
        fn show(&self) -> Result<(), String> {
            self.log.lock().shown += 1;
            Ok(())
        }

        fn reload(&self, ignore_cache: bool) -> Result<(), String> {
            self.log.lock().reloads.push(ignore_cache);
            Ok(())
        }

        fn set_zoom(&self, factor: f64) -> Result<(), String> {
            self.log.lock().zoom.push(factor);
            Ok(())
        }

        fn open_devtools(&self) {
            let mut log = self.log.lock();
            if !log.devtools_open {
                log.devtools_opened += 1;
            }
            log.devtools_open = true;
        }

        fn close_devtools(&self) {
            self.log.lock().devtools_open = false;
        }

        fn is_devtools_open(&self) -> bool {
            self.log.lock().devtools_open
        }

        fn send(&self, channel: &str) -> Result<(), String> {
            self.log.lock().sent.push(channel.to_string());
            Ok(())
        }
    }

    pub(crate) struct FakeFactory {
        pub log: Arc<Mutex<SurfaceLog>>,
        pub fail: bool,
    }

    impl FakeFactory {
        pub fn new() -> Self {
            Self {
                log: Arc::new(Mutex::new(SurfaceLog::default())),
                fail: false,
            }
        }
    }

    impl WindowFactory for FakeFactory {
        type Surface = FakeSurface;

        fn create(&mut self, spec: &WindowSpec) -> Result<FakeSurface, String> {
            if self.fail {
                return Err("display unavailable".into());
            }
            let mut log = self.log.lock();
            log.created.push(spec.clone());
            log.devtools_open = false;
            Ok(FakeSurface {
                log: self.log.clone(),
            })
        }
    }

    fn manager(mode: RunMode) -> (WindowManager<FakeFactory>, Arc<Mutex<SurfaceLog>>) {
        let config = Arc::new(ShellConfig {
            run_mode: mode,
            ..ShellConfig::default()
        });
        let factory = FakeFactory::new();
        let log = factory.log.clone();
        (WindowManager::new(config, factory), log)
    }

    #[test]
    fn production_window_is_hidden_and_packaged() {
        let (mut wm, log) = manager(RunMode::Production);
        assert!(wm.create_main_window().unwrap());

        let log = log.lock();
        let spec = &log.created[0];
        assert_eq!(spec.label, MAIN_WINDOW_LABEL);
        assert_eq!(spec.source, ContentSource::Packaged("index.html".into()));
        assert_eq!((spec.min_width, spec.min_height), (1200.0, 800.0));
        assert!(!spec.open_devtools);
        assert_eq!(log.shown, 0);
        assert!(!wm.current().unwrap().is_visible());
    }

    #[test]
    fn development_loads_dev_server_with_devtools_once() {
        let (mut wm, log) = manager(RunMode::Development);
        wm.create_main_window().unwrap();
        assert_eq!(
            log.lock().created[0].source,
            ContentSource::DevServer(Url::parse("http://localhost:3000").unwrap())
        );

        assert!(wm.on_ready_to_show());
        let log = log.lock();
        assert_eq!(log.shown, 1);
        assert_eq!(log.devtools_opened, 1);
        assert!(log.devtools_open);
        assert!(wm.current().unwrap().devtools_open());
    }

    #[test]
    fn shows_only_on_first_ready() {
        let (mut wm, log) = manager(RunMode::Production);
        wm.create_main_window().unwrap();
        assert!(wm.on_ready_to_show());
        wm.apply(WindowOp::Reload);
        assert!(!wm.on_ready_to_show());
        assert_eq!(log.lock().shown, 1);
    }

    #[test]
    fn ready_without_window_is_ignored() {
        let (mut wm, _) = manager(RunMode::Production);
        assert!(!wm.on_ready_to_show());
    }

    #[test]
    fn activate_and_close_never_yield_two_windows() {
        let (mut wm, log) = manager(RunMode::Production);
        let events = ["activate", "activate", "close", "close", "activate", "close", "activate"];
        for event in events {
            match event {
                "activate" => {
                    wm.activate().unwrap();
                }
                _ => wm.on_closed(),
            }
            assert!(wm.current().iter().count() <= 1);
        }
        // Created on the first activation and after each close that preceded one.
        assert_eq!(log.lock().created.len(), 3);
        assert!(wm.has_window());
    }

    #[test]
    fn creation_failure_leaves_no_window() {
        let (mut wm, _) = manager(RunMode::Production);
        wm.factory.fail = true;
        let err = wm.create_main_window().unwrap_err();
        assert_eq!(err, ShellError::WindowCreationFailed("display unavailable".into()));
        assert!(!wm.has_window());

        wm.factory.fail = false;
        assert!(wm.activate().unwrap());
    }

    #[test]
    fn zoom_steps_by_half_levels_and_resets() {
        let (mut wm, log) = manager(RunMode::Production);
        wm.create_main_window().unwrap();
        wm.apply(WindowOp::ZoomIn);
        wm.apply(WindowOp::ZoomIn);
        assert_eq!(wm.current().unwrap().zoom_level(), 1.0);
        wm.apply(WindowOp::ZoomOut);
        wm.apply(WindowOp::ResetZoom);
        assert_eq!(wm.current().unwrap().zoom_level(), 0.0);

        let zoom = log.lock().zoom.clone();
        assert_eq!(zoom.len(), 4);
        assert!((zoom[1] - 1.2).abs() < 1e-9);
        assert_eq!(zoom[3], 1.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let (mut wm, _) = manager(RunMode::Production);
        wm.create_main_window().unwrap();
        for _ in 0..40 {
            wm.apply(WindowOp::ZoomOut);
        }
        assert_eq!(wm.current().unwrap().zoom_level(), MIN_ZOOM_LEVEL);
    }

    #[test]
    fn toggle_devtools_flips_state() {
        let (mut wm, log) = manager(RunMode::Production);
        wm.create_main_window().unwrap();
        wm.apply(WindowOp::ToggleDevTools);
        assert!(log.lock().devtools_open);
        wm.apply(WindowOp::ToggleDevTools);
        assert!(!log.lock().devtools_open);
        assert!(!wm.current().unwrap().devtools_open());
    }

    #[test]
    fn reload_variants() {
        let (mut wm, log) = manager(RunMode::Production);
        assert!(!wm.apply(WindowOp::Reload));
        wm.create_main_window().unwrap();
        assert!(wm.apply(WindowOp::Reload));
        assert!(wm.apply(WindowOp::ForceReload));
        assert_eq!(log.lock().reloads, vec![false, true]);
    }
}
