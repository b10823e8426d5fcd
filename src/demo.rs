// Demo mode: drive one simulated screen through a full bridge session
//
// A fake "web thread" posts raw envelopes the way a browser engine's script
// message handler would, while the screen side runs on a LocalSet and prints
// every script it would evaluate. Along the way the session shows:
// - the ready handshake and component name registration
// - lazy creation of components on the first accepted message
// - origin and activity gating (foreign pages and inactive screens are ignored)
// - replies correlated by message id
// - a farewell message sent from a will-disappear hook
//
// Run with: cargo run -- demo --diagnostics

use crate::bridge::{inbound, BridgeDirectory, ScriptEvaluator, WebViewId};
use crate::component::{
    BridgeComponent, BridgeDestination, ComponentContext, ComponentType, RegisteredComponent,
};
use crate::config::BridgeSettings;
use crate::delegate::BridgeDelegate;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Location the demo screen is loaded from unless overridden
pub const DEFAULT_LOCATION: &str = "https://app.example.com/home";

const DEMO_WEB_VIEW: WebViewId = WebViewId(1);

/// What the demo session produced
#[derive(Debug, Clone, Default)]
pub struct DemoSummary {
    /// Every script handed to the web view, in order
    pub scripts: Vec<String>,
    /// Inbound envelopes the registry accepted (handshakes and handled messages)
    pub accepted: usize,
    /// Inbound messages posted by the web side (including rejected ones)
    pub posted: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo components
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormConnect {
    submit_title: String,
}

/// Native submit button for a web form
struct FormComponent {
    context: ComponentContext,
    submit_title: Option<String>,
}

impl BridgeComponent for FormComponent {
    fn handle(&mut self, message: &Message) {
        match message.event() {
            "connect" => match message.decode_data::<FormConnect>() {
                Ok(data) => {
                    tracing::info!(title = %data.submit_title, "form connected");
                    self.submit_title = Some(data.submit_title);
                    self.context.reply_to("connect");
                }
                Err(e) => tracing::warn!(error = %e, "form connect payload invalid"),
            },
            "submitEnabled" | "submitDisabled" => {
                tracing::info!(
                    event = message.event(),
                    title = self.submit_title.as_deref().unwrap_or("<unset>"),
                    "form submit state changed"
                );
            }
            other => tracing::debug!(event = other, "form ignored event"),
        }
    }
}

impl RegisteredComponent for FormComponent {
    const NAME: &'static str = "form";

    fn create(context: ComponentContext) -> Self {
        Self {
            context,
            submit_title: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MenuDisplay {
    title: String,
    items: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MenuSelection {
    index: usize,
}

/// Native action sheet; always picks the first item
struct MenuComponent {
    context: ComponentContext,
}

impl BridgeComponent for MenuComponent {
    fn handle(&mut self, message: &Message) {
        if message.event() != "display" {
            return;
        }
        let menu: MenuDisplay = match message.decode_data() {
            Ok(menu) => menu,
            Err(e) => {
                tracing::warn!(error = %e, "menu payload invalid");
                return;
            }
        };
        if menu.items.is_empty() {
            tracing::debug!(title = %menu.title, "menu has no items");
            return;
        }

        tracing::info!(title = %menu.title, choice = %menu.items[0], "menu item selected");
        if let Err(e) = self.context.reply_to_with("display", &MenuSelection { index: 0 }) {
            tracing::warn!(error = %e, "menu reply failed");
        }
    }
}

impl RegisteredComponent for MenuComponent {
    const NAME: &'static str = "menu";

    fn create(context: ComponentContext) -> Self {
        Self { context }
    }
}

/// Page-level component that tells the web content when the screen goes away
struct PageComponent {
    context: ComponentContext,
}

impl BridgeComponent for PageComponent {
    fn handle(&mut self, message: &Message) {
        tracing::debug!(event = message.event(), "page received event");
    }

    fn on_view_will_disappear(&mut self) {
        let Some(last) = self.context.received_message("connect") else {
            return;
        };
        self.context.send(last.replacing("disappear", json!({})));
    }
}

impl RegisteredComponent for PageComponent {
    const NAME: &'static str = "page";

    fn create(context: ComponentContext) -> Self {
        Self { context }
    }
}

/// Component types registered on the demo screen
pub fn component_types() -> Vec<ComponentType> {
    vec![
        ComponentType::of::<FormComponent>(),
        ComponentType::of::<MenuComponent>(),
        ComponentType::of::<PageComponent>(),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Host doubles
// ─────────────────────────────────────────────────────────────────────────────

struct DemoScreen;

impl BridgeDestination for DemoScreen {}

/// Prints scripts instead of running them in a browser engine
#[derive(Clone, Default)]
struct ConsoleEvaluator {
    transcript: Rc<RefCell<Vec<String>>>,
    echo: bool,
}

impl ScriptEvaluator for ConsoleEvaluator {
    fn evaluate_javascript(&self, script: &str) -> anyhow::Result<()> {
        if self.echo {
            println!("  js> {}", script);
        }
        self.transcript.borrow_mut().push(script.to_string());
        Ok(())
    }
}

/// Raw envelopes the simulated web content posts, in order
fn web_script(location: &str) -> Vec<String> {
    let envelope = |component: &str, event: &str, id: &str, url: &str, data: serde_json::Value| {
        json!({
            "type": "message",
            "id": id,
            "component": component,
            "event": event,
            "metadata": {"url": url},
            "data": data,
        })
        .to_string()
    };

    vec![
        json!({"type": "ready"}).to_string(),
        envelope("form", "connect", "1", location, json!({"submitTitle": "Save"})),
        envelope("page", "connect", "2", location, json!({})),
        envelope("menu", "display", "3", location, json!({"title": "Sort", "items": ["Newest", "Oldest"]})),
        // Another page in the same web view: not ours
        envelope("form", "submitEnabled", "4", "https://ads.example.net/frame", json!({})),
        // Nobody registered this component
        envelope("checkout", "pay", "5", location, json!({})),
        "{not json".to_string(),
        envelope("form", "submitEnabled", "6", location, json!({})),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Run one simulated screen session
///
/// Must be called from within a tokio runtime; the screen side runs on its
/// own `LocalSet`.
pub async fn run_demo(
    location: &str,
    settings: &BridgeSettings,
    echo: bool,
) -> anyhow::Result<DemoSummary> {
    let local = tokio::task::LocalSet::new();
    local.run_until(session(location, settings, echo)).await
}

async fn session(
    location: &str,
    settings: &BridgeSettings,
    echo: bool,
) -> anyhow::Result<DemoSummary> {
    let evaluator = ConsoleEvaluator {
        echo,
        ..ConsoleEvaluator::default()
    };
    let transcript = Rc::clone(&evaluator.transcript);

    let mut directory = BridgeDirectory::from_settings(settings);
    let bridge = directory.initialize(DEMO_WEB_VIEW, evaluator);

    let screen: Rc<dyn BridgeDestination> = Rc::new(DemoScreen);
    let delegate = BridgeDelegate::try_new(location, Rc::downgrade(&screen), component_types())?;

    tracing::info!(location, web_view = %DEMO_WEB_VIEW, "demo screen created");
    delegate.web_view_did_become_active(&directory, DEMO_WEB_VIEW);

    // Traffic before the view loads is dropped
    let early = json!({
        "type": "message",
        "component": "form",
        "event": "connect",
        "metadata": {"url": location},
    })
    .to_string();
    bridge.receive(&early);

    delegate.on_view_did_load();
    delegate.on_view_will_appear();
    delegate.on_view_did_appear();

    let (sender, receiver) = inbound::channel(settings.inbound_capacity);
    let pump = tokio::task::spawn_local(receiver.run(Rc::clone(&bridge)));

    let raw_messages = web_script(location);
    let posted = raw_messages.len();
    let web = tokio::spawn(async move {
        for raw in raw_messages {
            sender.post_async(raw).await?;
        }
        Ok::<_, crate::error::BridgeError>(())
    });

    web.await??;
    let accepted = pump.await?;

    let instantiated: Vec<String> = delegate
        .component_names()
        .into_iter()
        .filter(|name| delegate.is_instantiated(name))
        .collect();
    tracing::info!(?instantiated, accepted, "demo traffic delivered");

    delegate.on_view_will_disappear();
    delegate.on_view_did_disappear();
    delegate.web_view_did_become_deactivated();

    // Screen is gone from the user's point of view: sends go nowhere now
    delegate.send(Message::new("", "page", "late", None, json!(null)));

    let scripts = transcript.borrow().clone();
    Ok(DemoSummary {
        scripts,
        accepted,
        posted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_session_transcript() {
        let summary = run_demo("/home", &BridgeSettings::default(), false)
            .await
            .unwrap();

        // ready, form/connect, page/connect, menu/display, form/submitEnabled
        assert_eq!(summary.accepted, 5);
        assert_eq!(summary.posted, 8);

        let scripts = &summary.scripts;
        // Bind registers once, ready re-registers
        let registrations = scripts
            .iter()
            .filter(|s| s.as_str() == r#"window.nativeBridge.register(["form","menu","page"])"#)
            .count();
        assert_eq!(registrations, 2);

        let replies: Vec<_> = scripts
            .iter()
            .filter(|s| s.starts_with("window.nativeBridge.replyWith("))
            .collect();
        // connect echo, menu selection, page farewell
        assert_eq!(replies.len(), 3);
        assert!(replies[0].contains(r#""event":"connect""#));
        assert!(replies[1].contains(r#""index":0"#));
        assert!(replies[2].contains(r#""event":"disappear""#));
        assert!(!scripts.iter().any(|s| s.contains("late")));
    }

    #[tokio::test]
    async fn test_demo_uses_configured_namespace() {
        let settings = BridgeSettings {
            script_namespace: "app.bridge".to_string(),
            inbound_capacity: 1,
        };
        let summary = run_demo("/home", &settings, false).await.unwrap();

        assert!(summary.scripts.iter().all(|s| s.starts_with("app.bridge.")));
        assert_eq!(summary.accepted, 5);
    }

    #[test]
    fn test_web_script_is_valid_json_except_malformed_entry() {
        let script = web_script("/home");
        let invalid = script
            .iter()
            .filter(|raw| serde_json::from_str::<serde_json::Value>(raw).is_err())
            .count();
        assert_eq!(invalid, 1);
    }
}
