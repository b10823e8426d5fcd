//! Bidirectional message bridge between native screens and embedded web content
//!
//! Each native screen owns a [`BridgeDelegate`]: a registry of named
//! components that are created lazily when the web content first talks to
//! them. The registry only accepts messages while its screen is active and
//! only from the location it was created for, fans lifecycle transitions out
//! to the components it has created, and sends outbound messages through
//! whichever transport adapter ([`Bridgable`]) is currently bound.
//!
//! ```text
//! web content ─► Bridge (adapter) ─► BridgeDelegate ─► BridgeComponent
//!      ▲                                   │
//!      └──────────── ScriptEvaluator ◄─────┘ send / register
//! ```

pub mod bridge;
pub mod cli;
pub mod component;
pub mod config;
pub mod delegate;
pub mod demo;
pub mod error;
pub mod logging;
pub mod message;

pub use bridge::{Bridgable, Bridge, BridgeDirectory, ScriptBuilder, ScriptEvaluator, WebViewId};
pub use component::{
    BridgeComponent, BridgeDestination, ComponentContext, ComponentType, RegisteredComponent,
};
pub use delegate::{BridgeDelegate, ComponentRef, DelegateHandle, LifecycleEvent, LifecycleState};
pub use error::{BridgeError, Result};
pub use message::{Message, Metadata};
