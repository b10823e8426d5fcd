//! Per-screen component registry and lifecycle coordinator
//!
//! A [`BridgeDelegate`] is owned by one native screen. It knows the screen's
//! component types, creates components lazily the first time a message for
//! them is accepted, and decides whether inbound traffic is accepted at all:
//! the screen must be active and the message must come from the location the
//! registry was created for.
//!
//! # Lifecycle
//!
//! ```text
//! Inactive ──did_load──► Loading ──will_appear──► Appearing ──did_appear──► Active
//!    ▲                                                                        │
//!    └────────── did_disappear ◄── Disappearing ◄────── will_disappear ───────┘
//! ```
//!
//! Appearance flips `active` on before components are notified, so a message
//! sent from inside a hook is itself routable. Disappearance notifies first
//! and flips `active` off afterwards, so components can still say goodbye.
//!
//! # Ownership
//!
//! The screen owns the delegate; the delegate owns the components. Everything
//! pointing back up (component → delegate, delegate → screen, delegate →
//! adapter) is a `Weak` handle, and a dead handle turns the call into a logged
//! no-op. All of this is single-threaded; inbound traffic from the web content
//! is marshaled through [`crate::bridge::inbound`] first.

use crate::bridge::{Bridgable, BridgeDirectory, WebViewId};
use crate::component::{
    BridgeComponent, BridgeDestination, ComponentContext, ComponentType, ReceivedMessages,
};
use crate::error::{BridgeError, Result};
use crate::message::Message;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Where the owning screen is in its appearance cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Not visible (initial, and after the view fully disappeared)
    #[default]
    Inactive,
    /// View loaded, content loading
    Loading,
    /// View about to appear
    Appearing,
    /// View fully on screen
    Active,
    /// View about to go away
    Disappearing,
}

/// Lifecycle notifications from the host screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    ViewDidLoad,
    ViewWillAppear,
    ViewDidAppear,
    ViewWillDisappear,
    ViewDidDisappear,
}

impl LifecycleEvent {
    /// State the registry is in once this event has been applied
    pub fn target_state(self) -> LifecycleState {
        match self {
            Self::ViewDidLoad => LifecycleState::Loading,
            Self::ViewWillAppear => LifecycleState::Appearing,
            Self::ViewDidAppear => LifecycleState::Active,
            Self::ViewWillDisappear => LifecycleState::Disappearing,
            Self::ViewDidDisappear => LifecycleState::Inactive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewDidLoad => "view_did_load",
            Self::ViewWillAppear => "view_will_appear",
            Self::ViewDidAppear => "view_did_appear",
            Self::ViewWillDisappear => "view_will_disappear",
            Self::ViewDidDisappear => "view_did_disappear",
        }
    }

    fn notify(self, component: &mut dyn BridgeComponent) {
        match self {
            Self::ViewDidLoad => component.on_view_did_load(),
            Self::ViewWillAppear => component.on_view_will_appear(),
            Self::ViewDidAppear => component.on_view_did_appear(),
            Self::ViewWillDisappear => component.on_view_will_disappear(),
            Self::ViewDidDisappear => component.on_view_did_disappear(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Component slots
// ─────────────────────────────────────────────────────────────────────────────

struct ComponentSlot {
    name: String,
    instance: RefCell<Box<dyn BridgeComponent>>,
    received: ReceivedMessages,
}

/// Shared reference to a live component
///
/// Two refs for the same name on the same registry always point at the same
/// instance.
#[derive(Clone)]
pub struct ComponentRef(Rc<ComponentSlot>);

impl ComponentRef {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Whether both refs point at the same component instance
    pub fn same_instance(&self, other: &ComponentRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Run `f` against the component
    ///
    /// Returns `None` if the component is already borrowed (called from
    /// inside its own handler or hook).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn BridgeComponent) -> R) -> Option<R> {
        let mut instance = self.0.instance.try_borrow_mut().ok()?;
        Some(f(instance.as_mut()))
    }

    /// Last message dispatched to this component for `event`
    pub fn last_received(&self, event: &str) -> Option<Message> {
        self.0.received.borrow().get(event).cloned()
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentRef").field(&self.0.name).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry state
// ─────────────────────────────────────────────────────────────────────────────

struct Registry {
    location: String,
    destination: Weak<dyn BridgeDestination>,
    component_types: Vec<ComponentType>,
    components: RefCell<HashMap<String, Rc<ComponentSlot>>>,
    /// Names whose factory is currently running
    constructing: RefCell<HashSet<String>>,
    active: Cell<bool>,
    lifecycle: Cell<LifecycleState>,
    bridge: RefCell<Option<Weak<dyn Bridgable>>>,
    web_view: Cell<Option<WebViewId>>,
    names_registered: Cell<bool>,
}

impl Registry {
    fn component_names(&self) -> Vec<String> {
        self.component_types
            .iter()
            .map(|ty| ty.name().to_string())
            .collect()
    }

    fn bridge(&self) -> Option<Rc<dyn Bridgable>> {
        self.bridge.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn existing(&self, name: &str) -> Option<Rc<ComponentSlot>> {
        self.components.borrow().get(name).cloned()
    }

    /// Existing instance for `name`, or a new one from the first matching type
    fn resolve(self: &Rc<Self>, name: &str) -> Option<Rc<ComponentSlot>> {
        if let Some(slot) = self.existing(name) {
            return Some(slot);
        }

        let component_type = self.component_types.iter().find(|ty| ty.name() == name)?;

        if !self.constructing.borrow_mut().insert(name.to_string()) {
            tracing::warn!(
                component = name,
                location = %self.location,
                "bridge ignored re-entrant resolve: component is being created"
            );
            return None;
        }

        // Build without holding the map borrow: factories are host code
        let received = ReceivedMessages::default();
        let context = ComponentContext::new(
            name.to_string(),
            self.destination.clone(),
            DelegateHandle::new(self),
            Rc::clone(&received),
        );
        let slot = Rc::new(ComponentSlot {
            name: name.to_string(),
            instance: RefCell::new(component_type.instantiate(context)),
            received,
        });
        self.constructing.borrow_mut().remove(name);

        tracing::debug!(component = name, location = %self.location, "bridge created component");

        let mut components = self.components.borrow_mut();
        let slot = Rc::clone(components.entry(name.to_string()).or_insert(slot));
        Some(slot)
    }

    /// Live slots in registration order
    fn live_slots(&self) -> Vec<Rc<ComponentSlot>> {
        let components = self.components.borrow();
        self.component_types
            .iter()
            .filter_map(|ty| components.get(ty.name()).cloned())
            .collect()
    }

    fn deliver_inbound(self: &Rc<Self>, message: Message) -> bool {
        let active = self.active.get();
        if !active || message.origin_location() != Some(self.location.as_str()) {
            tracing::debug!(
                component = message.component(),
                event = message.event(),
                origin = message.origin_location().unwrap_or("<none>"),
                location = %self.location,
                active,
                "bridge ignored message"
            );
            return false;
        }

        let Some(slot) = self.resolve(message.component()) else {
            tracing::warn!(
                component = message.component(),
                event = message.event(),
                location = %self.location,
                "bridge ignored message for unregistered component"
            );
            return false;
        };

        tracing::debug!(
            component = message.component(),
            event = message.event(),
            id = message.id(),
            "bridge received message"
        );

        let Ok(mut instance) = slot.instance.try_borrow_mut() else {
            tracing::warn!(
                component = message.component(),
                event = message.event(),
                "bridge dropped re-entrant message: component is busy"
            );
            return false;
        };
        // Only messages the component actually handles become reply targets
        slot.received
            .borrow_mut()
            .insert(message.event().to_string(), message.clone());
        instance.handle(&message);
        true
    }

    fn apply(&self, event: LifecycleEvent) {
        let target = event.target_state();
        if self.lifecycle.get() == target {
            tracing::debug!(
                event = event.as_str(),
                location = %self.location,
                "bridge ignored repeated lifecycle event"
            );
            return;
        }
        self.lifecycle.set(target);

        tracing::debug!(event = event.as_str(), location = %self.location, "bridge destination lifecycle");

        match event {
            LifecycleEvent::ViewDidLoad | LifecycleEvent::ViewWillAppear => {
                self.active.set(true);
                self.notify_components(event);
            }
            LifecycleEvent::ViewWillDisappear => {
                self.notify_components(event);
                self.active.set(false);
            }
            LifecycleEvent::ViewDidAppear | LifecycleEvent::ViewDidDisappear => {
                self.notify_components(event);
            }
        }
    }

    fn notify_components(&self, event: LifecycleEvent) {
        // Snapshot first: hooks may send, resolve, or query the registry
        for slot in self.live_slots() {
            match slot.instance.try_borrow_mut() {
                Ok(mut instance) => event.notify(instance.as_mut()),
                Err(_) => tracing::warn!(
                    component = %slot.name,
                    event = event.as_str(),
                    "bridge skipped lifecycle hook: component is busy"
                ),
            }
        }
    }

    fn send(&self, message: Message) {
        let Some(bridge) = self.bridge() else {
            tracing::debug!(
                component = message.component(),
                event = message.event(),
                location = %self.location,
                "bridge message failed to send: bridge is not available"
            );
            return;
        };
        tracing::debug!(
            component = message.component(),
            event = message.event(),
            id = message.id(),
            "bridge sending message"
        );
        bridge.send(&message);
    }

    fn bind(self: &Rc<Self>, bridge: Rc<dyn Bridgable>) {
        if let Some(previous) = self.bridge() {
            if !std::ptr::addr_eq(Rc::as_ptr(&previous), Rc::as_ptr(&bridge)) {
                self.release(previous.as_ref());
            }
        }

        // Set again by `web_view_did_become_active` when bound through a directory
        self.web_view.set(None);
        bridge.set_delegate(Some(DelegateHandle::new(self)));
        *self.bridge.borrow_mut() = Some(Rc::downgrade(&bridge));
        tracing::debug!(location = %self.location, "bridge bound");

        if !self.names_registered.get() {
            self.register_components();
        }
    }

    /// Clear the adapter's delegate, but only if it still points at us
    fn release(&self, bridge: &dyn Bridgable) {
        if bridge.delegate().is_some_and(|d| d.points_to(self)) {
            bridge.set_delegate(None);
        }
    }

    fn unbind(&self) {
        self.web_view.set(None);
        let previous = self.bridge.borrow_mut().take();
        match previous.as_ref().and_then(Weak::upgrade) {
            Some(bridge) => {
                self.release(bridge.as_ref());
                tracing::debug!(location = %self.location, "bridge unbound");
            }
            None => tracing::trace!(location = %self.location, "bridge unbind: already unbound"),
        }
    }

    fn register_components(&self) -> bool {
        let Some(bridge) = self.bridge() else {
            tracing::debug!(location = %self.location, "bridge cannot register components: not bound");
            return false;
        };
        bridge.register(&self.component_names());
        self.names_registered.set(true);
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Non-owning handle to a registry
///
/// Held by components and by the bound transport adapter. Every call is a
/// logged no-op once the registry has been dropped.
#[derive(Clone)]
pub struct DelegateHandle {
    registry: Weak<Registry>,
}

impl DelegateHandle {
    fn new(registry: &Rc<Registry>) -> Self {
        Self {
            registry: Rc::downgrade(registry),
        }
    }

    fn points_to(&self, registry: &Registry) -> bool {
        std::ptr::eq(self.registry.as_ptr(), registry)
    }

    /// Whether both handles refer to the same registry
    pub fn is_same(&self, other: &DelegateHandle) -> bool {
        Weak::ptr_eq(&self.registry, &other.registry)
    }

    /// Whether the registry is still alive
    pub fn is_alive(&self) -> bool {
        self.registry.strong_count() > 0
    }

    pub fn location(&self) -> Option<String> {
        self.registry.upgrade().map(|r| r.location.clone())
    }

    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|r| r.active.get())
    }

    /// Send a message to the web content through the registry's adapter
    pub fn send(&self, message: Message) {
        match self.registry.upgrade() {
            Some(registry) => registry.send(message),
            None => tracing::debug!(
                component = message.component(),
                event = message.event(),
                "bridge message failed to send: delegate is gone"
            ),
        }
    }

    /// Route an inbound message; see [`BridgeDelegate::deliver_inbound`]
    pub fn deliver_inbound(&self, message: Message) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.deliver_inbound(message),
            None => false,
        }
    }

    /// Web content (re)initialized: announce the component names again
    pub fn bridge_did_initialize(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.register_components())
    }
}

impl fmt::Debug for DelegateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registry.upgrade() {
            Some(registry) => f
                .debug_struct("DelegateHandle")
                .field("location", &registry.location)
                .finish(),
            None => f.write_str("DelegateHandle(<dropped>)"),
        }
    }
}

/// The registry for one native screen
///
/// Owns the screen's components. Dropping it drops them.
pub struct BridgeDelegate {
    registry: Rc<Registry>,
}

impl BridgeDelegate {
    /// Create a registry for `location`
    ///
    /// # Panics
    /// If two component types share a name, or a name is empty. Both are
    /// configuration defects; use [`BridgeDelegate::try_new`] when the type
    /// list is assembled at runtime.
    pub fn new(
        location: impl Into<String>,
        destination: Weak<dyn BridgeDestination>,
        component_types: Vec<ComponentType>,
    ) -> Self {
        match Self::try_new(location, destination, component_types) {
            Ok(delegate) => delegate,
            Err(e) => panic!("BridgeDelegate misconfigured: {e}"),
        }
    }

    /// Create a registry, rejecting duplicate or empty component names
    pub fn try_new(
        location: impl Into<String>,
        destination: Weak<dyn BridgeDestination>,
        component_types: Vec<ComponentType>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for ty in &component_types {
            if ty.name().is_empty() {
                return Err(BridgeError::EmptyComponentName);
            }
            if !seen.insert(ty.name()) {
                return Err(BridgeError::DuplicateComponent {
                    name: ty.name().to_string(),
                });
            }
        }

        Ok(Self {
            registry: Rc::new(Registry {
                location: location.into(),
                destination,
                component_types,
                components: RefCell::new(HashMap::new()),
                constructing: RefCell::new(HashSet::new()),
                active: Cell::new(false),
                lifecycle: Cell::new(LifecycleState::default()),
                bridge: RefCell::new(None),
                web_view: Cell::new(None),
                names_registered: Cell::new(false),
            }),
        })
    }

    /// Location this registry exchanges messages with
    pub fn location(&self) -> &str {
        &self.registry.location
    }

    pub fn is_active(&self) -> bool {
        self.registry.active.get()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.registry.lifecycle.get()
    }

    /// Web view this registry was last activated for, if still bound
    pub fn web_view(&self) -> Option<WebViewId> {
        self.registry.web_view.get()
    }

    /// Whether a live transport adapter is bound
    pub fn is_bound(&self) -> bool {
        self.registry.bridge().is_some()
    }

    /// Registered component names, in registration order
    pub fn component_names(&self) -> Vec<String> {
        self.registry.component_names()
    }

    pub fn handle(&self) -> DelegateHandle {
        DelegateHandle::new(&self.registry)
    }

    // ── Transport binding ───────────────────────────────────────────────────

    /// Bind to the adapter for `web_view`
    ///
    /// If the directory has no adapter for it, the registry is left unbound
    /// and sends become no-ops until a later bind succeeds.
    pub fn web_view_did_become_active(
        &self,
        directory: &BridgeDirectory,
        web_view: WebViewId,
    ) -> bool {
        let Some(bridge) = directory.bridge_for(web_view) else {
            tracing::warn!(
                %web_view,
                location = %self.registry.location,
                "bridge not initialized for web view"
            );
            self.unbind();
            return false;
        };
        self.bind(bridge);
        self.registry.web_view.set(Some(web_view));
        true
    }

    /// The web view went away or was handed to another screen
    pub fn web_view_did_become_deactivated(&self) {
        self.unbind();
    }

    /// Bind directly to an adapter
    ///
    /// Releases any different adapter bound before. The first successful
    /// bind announces the component names.
    pub fn bind(&self, bridge: Rc<dyn Bridgable>) {
        self.registry.bind(bridge);
    }

    /// Drop the adapter link in both directions; safe to repeat
    pub fn unbind(&self) {
        self.registry.unbind();
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    pub fn on_view_did_load(&self) {
        self.apply(LifecycleEvent::ViewDidLoad);
    }

    pub fn on_view_will_appear(&self) {
        self.apply(LifecycleEvent::ViewWillAppear);
    }

    pub fn on_view_did_appear(&self) {
        self.apply(LifecycleEvent::ViewDidAppear);
    }

    pub fn on_view_will_disappear(&self) {
        self.apply(LifecycleEvent::ViewWillDisappear);
    }

    pub fn on_view_did_disappear(&self) {
        self.apply(LifecycleEvent::ViewDidDisappear);
    }

    /// Apply a lifecycle event; a repeat of the current state is a no-op
    pub fn apply(&self, event: LifecycleEvent) {
        self.registry.apply(event);
    }

    // ── Routing ─────────────────────────────────────────────────────────────

    /// Route an inbound message to its component
    ///
    /// Accepted only while active and only from this registry's location;
    /// the target component is created on first use. Returns true if a
    /// component handled the message.
    pub fn deliver_inbound(&self, message: Message) -> bool {
        self.registry.deliver_inbound(message)
    }

    /// Existing component for `name`, creating it if a type is registered
    pub fn resolve(&self, name: &str) -> Option<ComponentRef> {
        self.registry.resolve(name).map(ComponentRef)
    }

    /// Existing component for `name`; never creates one
    pub fn component(&self, name: &str) -> Option<ComponentRef> {
        self.registry.existing(name).map(ComponentRef)
    }

    pub fn is_instantiated(&self, name: &str) -> bool {
        self.registry.components.borrow().contains_key(name)
    }

    /// Send through the bound adapter; a no-op when unbound
    pub fn send(&self, message: Message) {
        self.registry.send(message);
    }
}

impl fmt::Debug for BridgeDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeDelegate")
            .field("location", &self.registry.location)
            .field("active", &self.registry.active.get())
            .field("lifecycle", &self.registry.lifecycle.get())
            .field("component_types", &self.registry.component_types)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
