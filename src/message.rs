// Messages exchanged between native components and the web content
//
// A message names its target component and an event, carries an arbitrary
// JSON payload, and records which web location it came from. Messages are
// immutable: replies are built with `replacing` / `with_encoded_data`, which
// keep the id, component and metadata of the original so the web side can
// correlate them.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Addressing metadata attached by the web content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Location of the page that sent the message
    pub url: String,
}

impl Metadata {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A named event addressed to one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    id: String,
    component: String,
    event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    #[serde(default)]
    data: Value,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        component: impl Into<String>,
        event: impl Into<String>,
        metadata: Option<Metadata>,
        data: Value,
    ) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            event: event.into(),
            metadata,
            data,
        }
    }

    /// Parse a message from its JSON wire form
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Location the message originated from, if the sender recorded one
    pub fn origin_location(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.url.as_str())
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Decode the payload into a typed value
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.data)?)
    }

    /// New message with the same id/component/metadata but a different event and payload
    pub fn replacing(&self, event: impl Into<String>, data: Value) -> Self {
        Self {
            id: self.id.clone(),
            component: self.component.clone(),
            event: event.into(),
            metadata: self.metadata.clone(),
            data,
        }
    }

    /// Like [`Message::replacing`], encoding a serializable payload
    pub fn with_encoded_data<T: Serialize>(&self, event: impl Into<String>, data: &T) -> Result<Self> {
        let data = serde_json::to_value(data)?;
        Ok(self.replacing(event, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_wire_form() {
        let raw = r#"{
            "id": "7",
            "component": "form",
            "event": "connect",
            "metadata": {"url": "https://example.com/home"},
            "data": {"submitTitle": "Save"}
        }"#;

        let message = Message::from_json(raw).unwrap();
        assert_eq!(message.id(), "7");
        assert_eq!(message.component(), "form");
        assert_eq!(message.event(), "connect");
        assert_eq!(message.origin_location(), Some("https://example.com/home"));
        assert_eq!(message.data()["submitTitle"], json!("Save"));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let message = Message::from_json(r#"{"component": "menu", "event": "display"}"#).unwrap();
        assert_eq!(message.id(), "");
        assert!(message.metadata().is_none());
        assert_eq!(message.origin_location(), None);
        assert_eq!(message.data(), &Value::Null);
    }

    #[test]
    fn test_missing_component_is_rejected() {
        assert!(Message::from_json(r#"{"event": "display"}"#).is_err());
    }

    #[test]
    fn test_replacing_keeps_addressing() {
        let original = Message::new(
            "3",
            "menu",
            "display",
            Some(Metadata::new("/home")),
            json!({"items": ["a", "b"]}),
        );

        let reply = original.replacing("selected", json!({"index": 1}));
        assert_eq!(reply.id(), "3");
        assert_eq!(reply.component(), "menu");
        assert_eq!(reply.event(), "selected");
        assert_eq!(reply.origin_location(), Some("/home"));
        assert_eq!(reply.data(), &json!({"index": 1}));
        // Original untouched
        assert_eq!(original.event(), "display");
    }

    #[test]
    fn test_decode_and_encode_typed_data() {
        #[derive(Debug, Deserialize, Serialize, PartialEq)]
        struct Selection {
            index: usize,
        }

        let message = Message::new("1", "menu", "selected", None, json!({"index": 2}));
        let selection: Selection = message.decode_data().unwrap();
        assert_eq!(selection, Selection { index: 2 });

        let reply = message
            .with_encoded_data("ack", &Selection { index: 4 })
            .unwrap();
        assert_eq!(reply.data(), &json!({"index": 4}));

        let wrong: Result<Vec<String>> = message.decode_data();
        assert!(wrong.is_err());
    }

    #[test]
    fn test_metadata_omitted_when_absent() {
        let message = Message::new("", "page", "ping", None, Value::Null);
        let json = message.to_json().unwrap();
        assert!(!json.contains("metadata"));
    }
}
