//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        // Disabled file output still lists its keys so they can be discovered
        let file = self.logging.file.clone().unwrap_or_default();
        format!(
            r#"# hostbridge configuration

# Logging configuration (RUST_LOG env var overrides level)
[logging]
level = {log_level}
# Keep bridge diagnostics in memory and print them after `hostbridge demo`
capture = {log_capture}

# JSON log files in addition to stderr
[logging.file]
enabled = {log_file_enabled}
dir = {log_file_dir}
rotation = "{log_file_rotation}"  # hourly, daily, never
prefix = {log_file_prefix}

# Bridge runtime
[bridge]
# Global object in the web content exposing register() / replyWith()
script_namespace = {namespace}
# Raw inbound messages buffered between the web thread and the screen
inbound_capacity = {capacity}
"#,
            log_level = quoted(&self.logging.level),
            log_capture = self.logging.capture,
            log_file_enabled = self.logging.file.is_some(),
            log_file_dir = quoted(&file.dir.display().to_string()),
            log_file_rotation = file.rotation.as_str(),
            log_file_prefix = quoted(&file.prefix),
            namespace = quoted(&self.bridge.script_namespace),
            capacity = self.bridge.inbound_capacity,
        )
    }
}

/// TOML basic string with escapes
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
