//! Bridge settings: web-side script namespace and inbound queue size

use crate::bridge::ScriptBuilder;
use serde::Deserialize;

/// Bridge runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    /// Global object exposing `register` / `replyWith` in the web content
    pub script_namespace: String,
    /// Raw messages buffered between the web thread and the screen
    pub inbound_capacity: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            script_namespace: ScriptBuilder::DEFAULT_NAMESPACE.to_string(),
            inbound_capacity: 256,
        }
    }
}

/// Bridge settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileBridge {
    pub script_namespace: Option<String>,
    pub inbound_capacity: Option<usize>,
}

impl BridgeSettings {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileBridge>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            script_namespace: file
                .script_namespace
                .filter(|ns| !ns.trim().is_empty())
                .unwrap_or(defaults.script_namespace),
            inbound_capacity: file.inbound_capacity.unwrap_or(defaults.inbound_capacity),
        }
    }

    /// Script builder for the configured namespace
    pub fn scripts(&self) -> ScriptBuilder {
        ScriptBuilder::new(self.script_namespace.clone())
    }
}
