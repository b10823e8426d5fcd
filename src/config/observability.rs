//! `[logging]` section: output level, diagnostic capture and JSON log files

use serde::Deserialize;
use std::path::PathBuf;

/// How often the JSON log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    /// One file for the lifetime of the process
    Never,
}

impl LogRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

/// Where JSON log files go
#[derive(Debug, Clone, PartialEq)]
pub struct LogFile {
    pub dir: PathBuf,
    pub rotation: LogRotation,
    /// File name prefix; the rotation suffix is appended ("hostbridge.2024-01-15")
    pub prefix: String,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./logs"),
            rotation: LogRotation::Daily,
            prefix: "hostbridge".to_string(),
        }
    }
}

/// Effective logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Filter for stderr and file output: trace, debug, info, warn, error
    pub level: String,
    /// Keep bridge diagnostics in memory and print them after a demo session
    pub capture: bool,
    /// JSON file output in addition to stderr; `None` when disabled
    pub file: Option<LogFile>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            capture: false,
            file: None,
        }
    }
}

/// `[logging]` as written in the config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub capture: Option<bool>,
    pub file: Option<FileLogFile>,
}

/// `[logging.file]` as written in the config file
///
/// The table being present turns file output on unless `enabled = false`.
#[derive(Debug, Deserialize, Default)]
pub struct FileLogFile {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
    pub rotation: Option<LogRotation>,
    pub prefix: Option<String>,
}

impl LogFile {
    fn from_file(file: FileLogFile) -> Option<Self> {
        if !file.enabled.unwrap_or(true) {
            return None;
        }
        let defaults = Self::default();
        Some(Self {
            dir: file.dir.unwrap_or(defaults.dir),
            rotation: file.rotation.unwrap_or(defaults.rotation),
            prefix: file.prefix.unwrap_or(defaults.prefix),
        })
    }
}

impl LoggingConfig {
    /// Fill whatever the file leaves out with defaults
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let Some(file) = file else {
            return Self::default();
        };
        let defaults = Self::default();

        Self {
            level: file.level.unwrap_or(defaults.level),
            capture: file.capture.unwrap_or(defaults.capture),
            file: file.file.and_then(LogFile::from_file),
        }
    }
}
