//! Component contract - native handlers paired with web-side counterparts
//!
//! A component is a stateful handler for one named channel. The registry
//! ([`crate::delegate::BridgeDelegate`]) creates it on demand the first time a
//! message for its name is accepted, then keeps it alive for as long as the
//! registry lives.
//!
//! # Architecture
//!
//! ```text
//! ComponentType { name, factory }      (registered once, ordered)
//!        │  first accepted message for `name`
//!        ▼
//! Box<dyn BridgeComponent>  ◄── ComponentContext (weak delegate + destination)
//!        │
//!        ├── handle(message)             required
//!        └── on_view_* lifecycle hooks   optional
//! ```

use crate::delegate::DelegateHandle;
use crate::error::Result;
use crate::message::Message;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// The native screen that owns a registry
///
/// Held weakly by the registry and its components: the screen's lifetime is
/// managed by the host, not by the bridge.
pub trait BridgeDestination {
    /// Whether the screen's web view has finished loading and can run scripts
    fn bridge_web_view_is_ready(&self) -> bool {
        true
    }
}

/// Handler for messages sent to one named component
///
/// Only `handle` needs an implementation; lifecycle hooks default to no-ops.
pub trait BridgeComponent {
    /// Process a message the registry routed to this component
    ///
    /// The default implementation is a programmer error: the registry only
    /// dispatches to registered component types, so reaching it means a type
    /// forgot to override it.
    fn handle(&mut self, message: &Message) {
        panic!(
            "BridgeComponent misuse: component '{}' received event '{}' but does not override handle()",
            message.component(),
            message.event()
        );
    }

    fn on_view_did_load(&mut self) {}
    fn on_view_will_appear(&mut self) {}
    fn on_view_did_appear(&mut self) {}
    fn on_view_will_disappear(&mut self) {}
    fn on_view_did_disappear(&mut self) {}
}

/// Component types that can be registered by type via [`ComponentType::of`]
pub trait RegisteredComponent: BridgeComponent + 'static {
    /// Channel name shared with the web-side handler
    const NAME: &'static str;

    fn create(context: ComponentContext) -> Self;
}

/// Factory producing a component instance from its context
pub type ComponentFactory = Rc<dyn Fn(ComponentContext) -> Box<dyn BridgeComponent>>;

/// Static descriptor for one component kind: name + factory
#[derive(Clone)]
pub struct ComponentType {
    name: String,
    factory: ComponentFactory,
}

impl ComponentType {
    /// Descriptor for a component implementing [`RegisteredComponent`]
    pub fn of<C: RegisteredComponent>() -> Self {
        Self::new(C::NAME, |context| {
            Box::new(C::create(context)) as Box<dyn BridgeComponent>
        })
    }

    /// Descriptor from an explicit name and factory
    ///
    /// The factory may capture host services; it runs at most once per registry.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(ComponentContext) -> Box<dyn BridgeComponent> + 'static,
    {
        Self {
            name: name.into(),
            factory: Rc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instantiate(&self, context: ComponentContext) -> Box<dyn BridgeComponent> {
        (self.factory)(context)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Last message received per event, shared between a component and its registry slot
pub(crate) type ReceivedMessages = Rc<RefCell<HashMap<String, Message>>>;

/// Everything a component gets at construction
///
/// Both back-references are weak: once the screen or registry is gone, sends
/// become logged no-ops rather than faults.
#[derive(Clone)]
pub struct ComponentContext {
    name: String,
    destination: Weak<dyn BridgeDestination>,
    delegate: DelegateHandle,
    received: ReceivedMessages,
}

impl ComponentContext {
    pub(crate) fn new(
        name: String,
        destination: Weak<dyn BridgeDestination>,
        delegate: DelegateHandle,
        received: ReceivedMessages,
    ) -> Self {
        Self {
            name,
            destination,
            delegate,
            received,
        }
    }

    /// Name this component was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning screen, if it is still alive
    pub fn destination(&self) -> Option<Rc<dyn BridgeDestination>> {
        self.destination.upgrade()
    }

    pub fn delegate(&self) -> &DelegateHandle {
        &self.delegate
    }

    /// Send a message to the web content through the owning registry
    pub fn send(&self, message: Message) {
        self.delegate.send(message);
    }

    /// Last message received for `event`, if any
    pub fn received_message(&self, event: &str) -> Option<Message> {
        self.received.borrow().get(event).cloned()
    }

    /// Echo the last message received for `event` back to the web content
    ///
    /// Returns false when nothing was received for that event yet.
    pub fn reply_to(&self, event: &str) -> bool {
        let Some(message) = self.received_message(event) else {
            tracing::debug!(
                component = %self.name,
                event,
                "bridge reply skipped: no message received for event"
            );
            return false;
        };
        self.send(message);
        true
    }

    /// Reply to the last message received for `event` with a new payload
    pub fn reply_to_with<T: Serialize>(&self, event: &str, data: &T) -> Result<bool> {
        let Some(message) = self.received_message(event) else {
            return Ok(false);
        };
        let reply = message.replacing(event, serde_json::to_value(data)?);
        self.send(reply);
        Ok(true)
    }
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("name", &self.name)
            .field("delegate", &self.delegate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct Bare;

    impl BridgeComponent for Bare {}

    struct Named;

    impl BridgeComponent for Named {
        fn handle(&mut self, _message: &Message) {}
    }

    impl RegisteredComponent for Named {
        const NAME: &'static str = "named";

        fn create(_context: ComponentContext) -> Self {
            Named
        }
    }

    #[test]
    fn test_component_type_of_uses_registered_name() {
        let ty = ComponentType::of::<Named>();
        assert_eq!(ty.name(), "named");
        assert!(format!("{:?}", ty).contains("named"));
    }

    #[test]
    #[should_panic(expected = "does not override handle()")]
    fn test_default_handle_is_fatal() {
        let message = Message::new("1", "bare", "ping", None, Value::Null);
        Bare.handle(&message);
    }

    #[test]
    fn test_default_lifecycle_hooks_are_no_ops() {
        let mut component = Bare;
        component.on_view_did_load();
        component.on_view_will_appear();
        component.on_view_did_appear();
        component.on_view_will_disappear();
        component.on_view_did_disappear();
    }
}
