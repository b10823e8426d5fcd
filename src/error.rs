//! Bridge error types
//!
//! Routing misses (inactive screen, foreign origin, unknown component) are not
//! errors: they are logged and dropped. The variants here cover
//! registration-time misconfiguration, JSON encoding, and the inbound queue.

use thiserror::Error;

/// Errors surfaced by the bridge core and its reference transport
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Two component types share a name in the registration list
    #[error("duplicate component name '{name}' in registration list")]
    DuplicateComponent { name: String },

    /// A component type was registered with an empty name
    #[error("component type registered with an empty name")]
    EmptyComponentName,

    /// Message or payload could not be encoded/decoded as JSON
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Inbound queue is at capacity (web content is outpacing the host)
    #[error("inbound queue is full ({capacity} pending messages)")]
    InboundQueueFull { capacity: usize },

    /// Inbound queue receiver was dropped (screen torn down)
    #[error("inbound queue is closed")]
    InboundQueueClosed,
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, BridgeError>;
