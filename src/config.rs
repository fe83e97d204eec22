use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "radar-shell";
const CONFIG_FILE_NAME: &str = "shell.json";

const ENV_RUN_MODE: &str = "RADAR_RUN_MODE";
const ENV_NODE_ENV: &str = "NODE_ENV";
const ENV_DEV_SERVER_URL: &str = "RADAR_DEV_SERVER_URL";
const ENV_BACKEND_PYTHON: &str = "RADAR_BACKEND_PYTHON";

/// Development vs. production. Decided once at startup, never mutated.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    #[default]
    Production,
}

impl RunMode {
    pub fn is_development(self) -> bool {
        self == RunMode::Development
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(RunMode::Development),
            "production" | "prod" => Some(RunMode::Production),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BackendConfig {
    #[serde(default = "default_backend_program")]
    pub program: String,
    /// Entry script, relative to the packaged resources directory.
    #[serde(default = "default_backend_script")]
    pub script: PathBuf,
    #[serde(default = "default_diagnostic_lines")]
    pub diagnostic_lines: usize,
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    #[serde(default = "default_min_height")]
    pub min_height: f64,
    /// Entry page, relative to the bundled frontend root.
    #[serde(default = "default_entry_page")]
    pub entry_page: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShellConfig {
    #[serde(default)]
    pub run_mode: RunMode,
    #[serde(default = "default_dev_server_url")]
    pub dev_server_url: String,
    /// Keep the app resident after its last window closes (macOS convention).
    #[serde(default = "default_resident_when_windowless")]
    pub resident_when_windowless: bool,
    /// Overrides the mode-dependent default ("debug" in development, "info" otherwise).
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

fn default_backend_program() -> String {
    "python".to_string()
}

fn default_backend_script() -> PathBuf {
    ["backend", "main.py"].iter().collect()
}

fn default_diagnostic_lines() -> usize {
    200
}

fn default_terminate_grace_ms() -> u64 {
    2000
}

fn default_title() -> String {
    "Radar Signal Analysis".to_string()
}

fn default_width() -> f64 {
    1400.0
}

fn default_height() -> f64 {
    900.0
}

fn default_min_width() -> f64 {
    1200.0
}

fn default_min_height() -> f64 {
    800.0
}

fn default_entry_page() -> String {
    "index.html".to_string()
}

fn default_dev_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_resident_when_windowless() -> bool {
    cfg!(target_os = "macos")
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: default_backend_program(),
            script: default_backend_script(),
            diagnostic_lines: default_diagnostic_lines(),
            terminate_grace_ms: default_terminate_grace_ms(),
        }
    }
}

impl BackendConfig {
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            min_width: default_min_width(),
            min_height: default_min_height(),
            entry_page: default_entry_page(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            dev_server_url: default_dev_server_url(),
            resident_when_windowless: default_resident_when_windowless(),
            log_level: None,
            backend: BackendConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Build the process-wide configuration: optional JSON file first, then
    /// environment overrides. A broken file is ignored and its error handed
    /// back, since this runs before the logger exists.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        Self::load_from(config_path().as_deref(), |key| std::env::var(key).ok())
    }

    pub fn load_from(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> (Self, Option<anyhow::Error>) {
        let (mut config, error) = match path {
            Some(path) if path.exists() => match Self::from_file(path) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            },
            _ => (Self::default(), None),
        };
        config.apply_overrides(lookup);
        (config, error)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ShellConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` so tests need not touch the
    /// real process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let mode = lookup(ENV_RUN_MODE)
            .as_deref()
            .and_then(RunMode::parse)
            .or_else(|| lookup(ENV_NODE_ENV).as_deref().and_then(RunMode::parse));
        if let Some(mode) = mode {
            self.run_mode = mode;
        }
        if let Some(url) = lookup(ENV_DEV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.dev_server_url = url.trim().to_string();
        }
        if let Some(program) = lookup(ENV_BACKEND_PYTHON).filter(|v| !v.trim().is_empty()) {
            self.backend.program = program.trim().to_string();
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(if self.run_mode.is_development() {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            })
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
