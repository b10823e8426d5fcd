//! JavaScript calls into the web-side bridge runtime

use crate::error::Result;
use crate::message::Message;

/// Builds the scripts the native side evaluates in the web view
///
/// The web runtime is expected to expose `register(names)` and
/// `replyWith(message)` under a configurable global namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBuilder {
    namespace: String,
}

impl ScriptBuilder {
    pub const DEFAULT_NAMESPACE: &'static str = "window.nativeBridge";

    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Announce the native component names to the web runtime
    pub fn register(&self, component_names: &[String]) -> Result<String> {
        let names = serde_json::to_string(component_names)?;
        Ok(format!("{}.register({})", self.namespace, names))
    }

    /// Deliver an outbound message to the web runtime
    pub fn reply_with(&self, message: &Message) -> Result<String> {
        Ok(format!("{}.replyWith({})", self.namespace, message.to_json()?))
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAMESPACE)
    }
}
