use url::Url;

use crate::config::{RunMode, ShellConfig};
use crate::error::ShellError;

/// Origins the packaged frontend is served from, per platform.
const PACKAGED_ORIGINS: &[&str] = &[
    "tauri://localhost",
    "http://tauri.localhost",
    "https://tauri.localhost",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Deny,
    /// Denied in place and handed to the system browser.
    OpenExternal,
}

/// Hands URLs to whatever the OS uses for links.
pub trait ExternalOpener {
    fn open_external(&self, url: &str) -> Result<(), String>;
}

/// Scheme, host and port. `Url::origin` is opaque for custom schemes such as
/// `tauri://`, so comparisons use this tuple instead.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OriginKey {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl OriginKey {
    fn of(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        Some(Self {
            scheme: url.scheme().to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port: url.port_or_known_default(),
        })
    }
}

/// Default-deny egress policy for content-originated navigation.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    mode: RunMode,
    allowed: Vec<OriginKey>,
}

impl NavigationGuard {
    /// `app_origin` is where the app's own pages are actually served from in
    /// production, when that differs from the packaged scheme (`tauri dev`
    /// serves them from the dev server).
    pub fn new(config: &ShellConfig, app_origin: Option<&Url>) -> Self {
        let allowed = match config.run_mode {
            RunMode::Development => match Url::parse(&config.dev_server_url) {
                Ok(url) => OriginKey::of(&url).into_iter().collect(),
                Err(e) => {
                    log::warn!(
                        "[Nav] Dev server URL {:?} is invalid ({}); all navigation will be denied",
                        config.dev_server_url,
                        e
                    );
                    Vec::new()
                }
            },
            RunMode::Production => match app_origin {
                Some(url) => OriginKey::of(url).into_iter().collect(),
                None => PACKAGED_ORIGINS
                    .iter()
                    .filter_map(|origin| Url::parse(origin).ok())
                    .filter_map(|url| OriginKey::of(&url))
                    .collect(),
            },
        };
        Self {
            mode: config.run_mode,
            allowed,
        }
    }

    pub fn evaluate_navigation(&self, url: &Url) -> NavigationDecision {
        match OriginKey::of(url) {
            Some(origin) if self.allowed.contains(&origin) => NavigationDecision::Allow,
            _ => NavigationDecision::Deny,
        }
    }

    /// Navigation hook for a content surface: `true` lets it proceed.
    pub fn allow_navigation(&self, url: &Url) -> bool {
        match self.evaluate_navigation(url) {
            NavigationDecision::Allow => true,
            _ => {
                let denied = ShellError::NavigationDenied {
                    url: url.to_string(),
                };
                log::debug!("[Nav] {} ({:?} mode)", denied, self.mode);
                false
            }
        }
    }

    /// Pop-ups never become app windows; the target goes to the system browser.
    /// `Deny` means the browser could not be reached and the pop-up is dropped.
    pub fn intercept_popup(&self, url: &Url, opener: &dyn ExternalOpener) -> NavigationDecision {
        log::info!("[Nav] Opening pop-up target externally: {}", url);
        match opener.open_external(url.as_str()) {
            Ok(()) => NavigationDecision::OpenExternal,
            Err(e) => {
                log::warn!("[Nav] Failed to open {} externally: {}", url, e);
                NavigationDecision::Deny
            }
        }
    }
}
