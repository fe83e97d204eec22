use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tauri::webview::{NewWindowResponse, PageLoadEvent};
use tauri::{
    AppHandle, Emitter, EventTarget, WebviewUrl, WebviewWindow, WebviewWindowBuilder,
};
use tauri_plugin_opener::OpenerExt;

use super::{ContentSource, ContentSurface, WindowFactory, WindowSpec};
use crate::navigation::{ExternalOpener, NavigationGuard};

/// Opens URLs in the system browser.
#[derive(Clone)]
pub struct SystemBrowser {
    app: AppHandle,
}

impl SystemBrowser {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ExternalOpener for SystemBrowser {
    fn open_external(&self, url: &str) -> Result<(), String> {
        self.app
            .opener()
            .open_url(url, None::<&str>)
            .map_err(|e| e.to_string())
    }
}

/// Builds webview windows with the navigation guard installed before the
/// first load.
pub struct WebviewFactory {
    app: AppHandle,
    guard: NavigationGuard,
    on_ready: Arc<dyn Fn() + Send + Sync>,
}

impl WebviewFactory {
    pub fn new(app: AppHandle, guard: NavigationGuard, on_ready: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            app,
            guard,
            on_ready,
        }
    }
}

impl WindowFactory for WebviewFactory {
    type Surface = WebviewWindow;

    fn create(&mut self, spec: &WindowSpec) -> Result<WebviewWindow, String> {
        let url = match &spec.source {
            ContentSource::DevServer(url) => WebviewUrl::External(url.clone()),
            ContentSource::Packaged(page) => WebviewUrl::App(page.into()),
        };

        let nav_guard = self.guard.clone();
        let popup_guard = self.guard.clone();
        let browser = SystemBrowser::new(self.app.clone());
        let on_ready = self.on_ready.clone();

        WebviewWindowBuilder::new(&self.app, &spec.label, url)
            .title(&spec.title)
            .inner_size(spec.width, spec.height)
            .min_inner_size(spec.min_width, spec.min_height)
            .visible(false)
            .on_navigation(move |url| nav_guard.allow_navigation(url))
            .on_new_window(move |url, _features| {
                let decision = popup_guard.intercept_popup(&url, &browser);
                log::debug!("[Window] Pop-up {} handled as {:?}", url, decision);
                NewWindowResponse::Deny
            })
            .on_page_load(move |_window, payload| {
                if payload.event() == PageLoadEvent::Finished {
                    on_ready();
                }
            })
            .build()
            .map_err(|e| e.to_string())
    }
}

impl ContentSurface for WebviewWindow {
    fn show(&self) -> Result<(), String> {
        WebviewWindow::show(self).map_err(|e| e.to_string())?;
        self.set_focus().map_err(|e| e.to_string())
    }

    fn reload(&self, ignore_cache: bool) -> Result<(), String> {
        if !ignore_cache {
            return WebviewWindow::reload(self).map_err(|e| e.to_string());
        }
        // No cache-bypassing reload in the webview API; reload a unique URL.
        let mut url = self.url().map_err(|e| e.to_string())?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "_reload")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("_reload", &stamp.to_string());
        self.navigate(url).map_err(|e| e.to_string())
    }

    fn set_zoom(&self, factor: f64) -> Result<(), String> {
        WebviewWindow::set_zoom(self, factor).map_err(|e| e.to_string())
    }

    fn open_devtools(&self) {
        WebviewWindow::open_devtools(self)
    }

    fn close_devtools(&self) {
        WebviewWindow::close_devtools(self)
    }

    fn is_devtools_open(&self) -> bool {
        WebviewWindow::is_devtools_open(self)
    }

    fn send(&self, channel: &str) -> Result<(), String> {
        self.emit_to(EventTarget::webview_window(self.label()), channel, ())
            .map_err(|e| e.to_string())
    }
}

