//! Configuration for the bridge host
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/hostbridge/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod bridge;
mod observability;
mod serialization;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use bridge::{BridgeSettings, FileBridge};
pub use observability::{FileLogFile, FileLogging, LogFile, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable names
pub const ENV_LOG_LEVEL: &str = "HOSTBRIDGE_LOG_LEVEL";
pub const ENV_LOG_CAPTURE: &str = "HOSTBRIDGE_LOG_CAPTURE";
pub const ENV_SCRIPT_NAMESPACE: &str = "HOSTBRIDGE_SCRIPT_NAMESPACE";
pub const ENV_INBOUND_CAPACITY: &str = "HOSTBRIDGE_INBOUND_CAPACITY";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Script namespace and inbound queue settings
    pub bridge: BridgeSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    /// Optional [logging] section
    pub logging: Option<FileLogging>,

    /// Optional [bridge] section
    pub bridge: Option<FileBridge>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/hostbridge/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("hostbridge").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    ///
    /// Best effort: config is optional, so failures are only logged.
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        if path.exists() {
            return;
        }
        if let Err(e) = Self::default().write_to(&path) {
            tracing::debug!(path = %path.display(), error = %e, "could not write config template");
        }
    }

    /// Write this configuration as TOML, creating parent directories
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml())
    }

    /// Read the config file at `path`
    ///
    /// A missing file yields defaults. A file that exists but cannot be read
    /// or parsed is an error: a broken config should fail loudly rather than
    /// silently fall back to defaults.
    pub(crate) fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let file = match Self::config_path() {
            Some(path) => Self::load_file_config(&path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file with environment overrides
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut logging = LoggingConfig::from_file(file.logging);
        let mut bridge = BridgeSettings::from_file(file.bridge);

        // Log level: env > file > default
        if let Some(level) = env(ENV_LOG_LEVEL) {
            logging.level = level;
        }

        // Diagnostic capture: env > file > default
        if let Some(capture) = env(ENV_LOG_CAPTURE).and_then(|v| parse_flag(&v)) {
            logging.capture = capture;
        }

        // Script namespace: env > file > default
        if let Some(namespace) = env(ENV_SCRIPT_NAMESPACE).filter(|ns| !ns.trim().is_empty()) {
            bridge.script_namespace = namespace;
        }

        // Inbound capacity: env > file > default (unparseable values are ignored)
        if let Some(capacity) = env(ENV_INBOUND_CAPACITY).and_then(|v| v.parse().ok()) {
            bridge.inbound_capacity = capacity;
        }

        Self { logging, bridge }
    }
}

/// "1"/"true"/"yes"/"on" and their negatives, case-insensitive
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
