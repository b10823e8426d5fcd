//! Transport adapters: the boundary between the registry and live web content
//!
//! # Architecture
//!
//! ```text
//!  web content ──raw JSON──► InboundSender ══ queue ══► InboundReceiver
//!                                                          │ drain / run
//!                                                          ▼
//!                                   Bridge::receive ──► DelegateHandle::deliver_inbound
//!                                                          │
//!  web content ◄── ScriptEvaluator ◄── Bridge::send ◄── registry send
//! ```
//!
//! [`Bridgable`] is the contract the registry relies on. [`Bridge`] is the
//! reference adapter: it speaks a small JSON envelope protocol inbound and
//! evaluates `register` / `replyWith` calls outbound. The browser engine itself
//! stays behind [`ScriptEvaluator`].

pub mod inbound;
mod script;

pub use script::ScriptBuilder;

use crate::config::BridgeSettings;
use crate::delegate::DelegateHandle;
use crate::message::Message;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────────────────────
// Contracts
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier for one embedded web view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WebViewId(pub u64);

impl fmt::Display for WebViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "webview-{}", self.0)
    }
}

/// What the registry needs from a transport adapter
///
/// An adapter has at most one delegate. Setting a new one replaces the
/// previous relationship.
pub trait Bridgable {
    fn delegate(&self) -> Option<DelegateHandle>;

    fn set_delegate(&self, delegate: Option<DelegateHandle>);

    /// Tell the web content which component channels exist
    fn register(&self, component_names: &[String]);

    /// Serialize and deliver an outbound message
    fn send(&self, message: &Message);
}

/// Browser-engine seam: run a script inside the web view
pub trait ScriptEvaluator {
    fn evaluate_javascript(&self, script: &str) -> anyhow::Result<()>;
}

/// Inbound wire envelope posted by the web runtime
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundEnvelope {
    /// Web runtime (re)loaded and wants the component names again
    Ready,
    /// A message for a native component
    Message(Message),
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Transport adapter for one web view
pub struct Bridge {
    web_view: WebViewId,
    evaluator: Box<dyn ScriptEvaluator>,
    scripts: ScriptBuilder,
    delegate: RefCell<Option<DelegateHandle>>,
}

impl Bridge {
    pub fn new(
        web_view: WebViewId,
        evaluator: impl ScriptEvaluator + 'static,
        scripts: ScriptBuilder,
    ) -> Self {
        Self {
            web_view,
            evaluator: Box::new(evaluator),
            scripts,
            delegate: RefCell::new(None),
        }
    }

    pub fn web_view(&self) -> WebViewId {
        self.web_view
    }

    /// Decode a raw inbound envelope and hand it to the current delegate
    ///
    /// Returns true if a message was accepted (or a ready handshake handled).
    /// Must be called on the registry's serialized context; see [`inbound`].
    pub fn receive(&self, raw: &str) -> bool {
        let envelope: InboundEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    web_view = %self.web_view,
                    error = %e,
                    "bridge received malformed message"
                );
                return false;
            }
        };

        // Clone the handle out so no borrow is held while components run
        let Some(delegate) = self.delegate() else {
            tracing::debug!(
                web_view = %self.web_view,
                "bridge received message with no delegate attached"
            );
            return false;
        };

        match envelope {
            InboundEnvelope::Ready => delegate.bridge_did_initialize(),
            InboundEnvelope::Message(message) => delegate.deliver_inbound(message),
        }
    }

    fn evaluate(&self, script: &str) {
        if let Err(e) = self.evaluator.evaluate_javascript(script) {
            tracing::warn!(
                web_view = %self.web_view,
                error = %e,
                "bridge script evaluation failed"
            );
        }
    }
}

impl Bridgable for Bridge {
    fn delegate(&self) -> Option<DelegateHandle> {
        self.delegate.borrow().clone()
    }

    fn set_delegate(&self, delegate: Option<DelegateHandle>) {
        *self.delegate.borrow_mut() = delegate;
    }

    fn register(&self, component_names: &[String]) {
        match self.scripts.register(component_names) {
            Ok(script) => self.evaluate(&script),
            Err(e) => tracing::warn!(error = %e, "bridge failed to encode component names"),
        }
    }

    fn send(&self, message: &Message) {
        match self.scripts.reply_with(message) {
            Ok(script) => self.evaluate(&script),
            Err(e) => tracing::warn!(
                component = message.component(),
                event = message.event(),
                error = %e,
                "bridge failed to encode outbound message"
            ),
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("web_view", &self.web_view)
            .field("scripts", &self.scripts)
            .field("delegate", &self.delegate.borrow())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

/// Map from web view to its adapter
///
/// One per host; registries look their adapter up here when a web view
/// becomes active.
#[derive(Debug, Default)]
pub struct BridgeDirectory {
    scripts: ScriptBuilder,
    bridges: HashMap<WebViewId, Rc<Bridge>>,
}

impl BridgeDirectory {
    pub fn new(scripts: ScriptBuilder) -> Self {
        Self {
            scripts,
            bridges: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self::new(settings.scripts())
    }

    /// Create the adapter for a web view, replacing any previous one
    pub fn initialize(
        &mut self,
        web_view: WebViewId,
        evaluator: impl ScriptEvaluator + 'static,
    ) -> Rc<Bridge> {
        let bridge = Rc::new(Bridge::new(web_view, evaluator, self.scripts.clone()));
        if self.bridges.insert(web_view, Rc::clone(&bridge)).is_some() {
            tracing::debug!(%web_view, "bridge replaced existing adapter for web view");
        }
        bridge
    }

    pub fn bridge_for(&self, web_view: WebViewId) -> Option<Rc<Bridge>> {
        self.bridges.get(&web_view).cloned()
    }

    /// Forget a web view's adapter (web view destroyed)
    pub fn remove(&mut self, web_view: WebViewId) -> Option<Rc<Bridge>> {
        self.bridges.remove(&web_view)
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BridgeComponent, BridgeDestination, ComponentType};
    use crate::delegate::BridgeDelegate;
    use serde_json::json;

    /// Evaluator that records scripts into a shared log
    #[derive(Clone, Default)]
    struct RecordingEvaluator {
        scripts: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptEvaluator for RecordingEvaluator {
        fn evaluate_javascript(&self, script: &str) -> anyhow::Result<()> {
            self.scripts.borrow_mut().push(script.to_string());
            Ok(())
        }
    }

    /// Evaluator whose engine always fails
    struct BrokenEvaluator;

    impl ScriptEvaluator for BrokenEvaluator {
        fn evaluate_javascript(&self, _script: &str) -> anyhow::Result<()> {
            anyhow::bail!("web view is gone")
        }
    }

    struct Screen;

    impl BridgeDestination for Screen {}

    /// Echoes every message back with an "ack" event
    struct Echo {
        context: crate::component::ComponentContext,
    }

    impl BridgeComponent for Echo {
        fn handle(&mut self, message: &Message) {
            self.context
                .send(message.replacing("ack", message.data().clone()));
        }
    }

    fn echo_type() -> ComponentType {
        ComponentType::new("echo", |context| Box::new(Echo { context }))
    }

    fn raw_message(url: &str) -> String {
        json!({
            "type": "message",
            "id": "1",
            "component": "echo",
            "event": "ping",
            "metadata": {"url": url},
            "data": {"n": 1}
        })
        .to_string()
    }

    struct Fixture {
        _screen: Rc<dyn BridgeDestination>,
        directory: BridgeDirectory,
        delegate: BridgeDelegate,
        scripts: Rc<RefCell<Vec<String>>>,
        bridge: Rc<Bridge>,
    }

    fn fixture() -> Fixture {
        let screen: Rc<dyn BridgeDestination> = Rc::new(Screen);
        let evaluator = RecordingEvaluator::default();
        let scripts = Rc::clone(&evaluator.scripts);
        let mut directory = BridgeDirectory::default();
        let bridge = directory.initialize(WebViewId(1), evaluator);
        let delegate = BridgeDelegate::new("/home", Rc::downgrade(&screen), vec![echo_type()]);
        Fixture {
            _screen: screen,
            directory,
            delegate,
            scripts,
            bridge,
        }
    }

    #[test]
    fn test_bind_registers_names_and_links_delegate() {
        let f = fixture();
        assert!(f.delegate.web_view_did_become_active(&f.directory, WebViewId(1)));

        assert_eq!(f.delegate.web_view(), Some(WebViewId(1)));
        assert!(f.bridge.delegate().is_some());
        assert_eq!(
            f.scripts.borrow().as_slice(),
            [r#"window.nativeBridge.register(["echo"])"#]
        );
    }

    #[test]
    fn test_direct_bind_forgets_previous_web_view() {
        let mut f = fixture();
        assert!(f.delegate.web_view_did_become_active(&f.directory, WebViewId(1)));
        assert_eq!(f.delegate.web_view(), Some(WebViewId(1)));

        let other = f.directory.initialize(WebViewId(2), RecordingEvaluator::default());
        f.delegate.bind(other.clone());

        assert_eq!(f.delegate.web_view(), None);
        assert!(f.bridge.delegate().is_none());
        assert!(other.delegate().is_some());
    }

    #[test]
    fn test_unknown_web_view_leaves_delegate_unbound() {
        let f = fixture();
        assert!(!f.delegate.web_view_did_become_active(&f.directory, WebViewId(42)));
        assert!(!f.delegate.is_bound());
        assert_eq!(f.delegate.web_view(), None);
        assert!(f.bridge.delegate().is_none());
    }

    #[test]
    fn test_message_round_trip_through_bridge() {
        let f = fixture();
        f.delegate.web_view_did_become_active(&f.directory, WebViewId(1));
        f.delegate.on_view_did_load();

        assert!(f.bridge.receive(&raw_message("/home")));

        let scripts = f.scripts.borrow();
        let reply = scripts.last().unwrap();
        assert!(reply.starts_with("window.nativeBridge.replyWith("));
        assert!(reply.contains(r#""event":"ack""#));
        assert!(reply.contains(r#""n":1"#));
    }

    #[test]
    fn test_foreign_origin_is_rejected_by_bridge() {
        let f = fixture();
        f.delegate.web_view_did_become_active(&f.directory, WebViewId(1));
        f.delegate.on_view_did_load();

        assert!(!f.bridge.receive(&raw_message("/elsewhere")));
        assert!(!f.delegate.is_instantiated("echo"));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let f = fixture();
        f.delegate.web_view_did_become_active(&f.directory, WebViewId(1));
        f.delegate.on_view_did_load();

        assert!(!f.bridge.receive("not json"));
        assert!(!f.bridge.receive(r#"{"type": "unknown"}"#));
        assert!(!f.bridge.receive(r#"{"type": "message", "event": "ping"}"#));
    }

    #[test]
    fn test_ready_handshake_re_registers_names() {
        let f = fixture();
        f.delegate.web_view_did_become_active(&f.directory, WebViewId(1));
        assert_eq!(f.scripts.borrow().len(), 1);

        assert!(f.bridge.receive(r#"{"type": "ready"}"#));
        assert_eq!(f.scripts.borrow().len(), 2);
        assert!(f.scripts.borrow()[1].contains("register"));
    }

    #[test]
    fn test_receive_without_delegate_is_dropped() {
        let f = fixture();
        assert!(!f.bridge.receive(&raw_message("/home")));
        assert!(!f.bridge.receive(r#"{"type": "ready"}"#));
    }

    #[test]
    fn test_evaluator_failure_does_not_propagate() {
        let screen: Rc<dyn BridgeDestination> = Rc::new(Screen);
        let mut directory = BridgeDirectory::default();
        let bridge = directory.initialize(WebViewId(7), BrokenEvaluator);
        let delegate = BridgeDelegate::new("/home", Rc::downgrade(&screen), vec![echo_type()]);

        assert!(delegate.web_view_did_become_active(&directory, WebViewId(7)));
        delegate.on_view_did_load();
        // Handler still runs and reports acceptance even though the reply fails
        assert!(bridge.receive(&raw_message("/home")));
    }

    #[test]
    fn test_directory_replace_and_remove() {
        let mut directory = BridgeDirectory::new(ScriptBuilder::new("app.bridge"));
        let first = directory.initialize(WebViewId(1), RecordingEvaluator::default());
        let second = directory.initialize(WebViewId(1), RecordingEvaluator::default());

        assert_eq!(directory.len(), 1);
        let current = directory.bridge_for(WebViewId(1)).unwrap();
        assert!(Rc::ptr_eq(&current, &second));
        assert!(!Rc::ptr_eq(&current, &first));

        assert!(directory.remove(WebViewId(1)).is_some());
        assert!(directory.is_empty());
        assert!(directory.bridge_for(WebViewId(1)).is_none());
    }

    #[test]
    fn test_removed_bridge_makes_sends_no_ops() {
        let f = fixture();
        let Fixture {
            _screen,
            mut directory,
            delegate,
            scripts,
            bridge,
        } = f;
        delegate.web_view_did_become_active(&directory, WebViewId(1));
        directory.remove(WebViewId(1));
        drop(bridge);

        assert!(!delegate.is_bound());
        delegate.send(Message::new("", "echo", "orphan", None, json!(null)));
        assert_eq!(scripts.borrow().len(), 1); // only the registration
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound handoff
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_messages_posted_from_another_thread_wait_for_drain() {
        let f = fixture();
        f.delegate.web_view_did_become_active(&f.directory, WebViewId(1));
        f.delegate.on_view_did_load();

        let (sender, mut receiver) = inbound::channel(8);
        let raw = raw_message("/home");
        std::thread::spawn(move || {
            sender.post(raw).unwrap();
        })
        .join()
        .unwrap();

        // Nothing touches the registry until the host drains
        assert!(!f.delegate.is_instantiated("echo"));
        assert_eq!(receiver.drain(&f.bridge), 1);
        assert!(f.delegate.is_instantiated("echo"));
    }

    #[test]
    fn test_full_queue_reports_backpressure() {
        let (sender, _receiver) = inbound::channel(1);
        sender.post("{}").unwrap();
        match sender.post("{}") {
            Err(crate::error::BridgeError::InboundQueueFull { capacity }) => {
                assert_eq!(capacity, 1)
            }
            other => panic!("Expected InboundQueueFull, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_queue_reports_closed() {
        let (sender, receiver) = inbound::channel(4);
        drop(receiver);
        assert!(sender.is_closed());
        assert!(matches!(
            sender.post("{}"),
            Err(crate::error::BridgeError::InboundQueueClosed)
        ));
    }

    #[tokio::test]
    async fn test_run_delivers_until_senders_drop() {
        let f = fixture();
        f.delegate.web_view_did_become_active(&f.directory, WebViewId(1));
        f.delegate.on_view_did_load();

        let (sender, receiver) = inbound::channel(8);
        let web_side = tokio::spawn(async move {
            sender.post_async(raw_message("/home")).await.unwrap();
            sender.post_async(r#"{"type": "ready"}"#).await.unwrap();
        });

        let local = tokio::task::LocalSet::new();
        let bridge = Rc::clone(&f.bridge);
        let accepted = local
            .run_until(async move {
                web_side.await.unwrap();
                receiver.run(bridge).await
            })
            .await;

        assert_eq!(accepted, 2);
        assert!(f.delegate.is_instantiated("echo"));
        let scripts = f.scripts.borrow();
        // register, ack reply, register again after ready
        assert_eq!(scripts.len(), 3);
    }
}
