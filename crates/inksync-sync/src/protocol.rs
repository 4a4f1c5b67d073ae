//! Wire format for deltas exchanged between clients.
//!
//! Every message is one JSON object, the same shape in both directions:
//!
//! ```json
//! { "clientId": "...", "type": "add",    "element": { ... } }
//! { "clientId": "...", "type": "update", "element": { ... } }
//! { "clientId": "...", "type": "delete", "id": "..." }
//! { "clientId": "...", "type": "full",   "elements": [ ... ] }
//! ```
//!
//! The `elements` array of a `full` message is interchangeable with an
//! exported snapshot file.

use inksync_core::{Element, ElementId};
use inksync_session::ClientId;
use serde::{Deserialize, Serialize};

/// One change to a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Delta {
    /// A newly created element
    Add { element: Element },
    /// The full new state of an existing element
    Update { element: Element },
    Delete { id: ElementId },
    /// The entire collection, for initial sync or recovery
    Full { elements: Vec<Element> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Add,
    Update,
    Delete,
    Full,
}

impl DeltaKind {
    pub fn name(self) -> &'static str {
        match self {
            DeltaKind::Add => "add",
            DeltaKind::Update => "update",
            DeltaKind::Delete => "delete",
            DeltaKind::Full => "full",
        }
    }
}

impl std::fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Delta {
    pub fn kind(&self) -> DeltaKind {
        match self {
            Delta::Add { .. } => DeltaKind::Add,
            Delta::Update { .. } => DeltaKind::Update,
            Delta::Delete { .. } => DeltaKind::Delete,
            Delta::Full { .. } => DeltaKind::Full,
        }
    }
}

/// A delta stamped with the client that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaMessage {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    #[serde(flatten)]
    pub delta: Delta,
}

impl DeltaMessage {
    pub fn new(client_id: ClientId, delta: Delta) -> Self {
        Self { client_id, delta }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inksync_core::{Shape, Style};
    use serde_json::json;

    fn rect() -> Element {
        Element::with_id(
            "e1".into(),
            Shape::Rectangle { x: 10.0, y: 10.0, width: 40.0, height: 30.0 },
            &Style::default(),
        )
    }

    #[test]
    fn add_message_layout() {
        let msg = DeltaMessage::new("client-a".into(), Delta::Add { element: rect() });
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["clientId"], "client-a");
        assert_eq!(value["type"], "add");
        assert_eq!(value["element"]["type"], "rectangle");
        assert_eq!(value["element"]["width"], 40.0);
    }

    #[test]
    fn decodes_each_kind() {
        let delete = DeltaMessage::decode(r#"{"clientId":"b","type":"delete","id":"e1"}"#).unwrap();
        assert_eq!(delete.delta, Delta::Delete { id: "e1".into() });

        let full = DeltaMessage::decode(r#"{"clientId":"b","type":"full","elements":[]}"#).unwrap();
        assert_eq!(full.delta, Delta::Full { elements: vec![] });

        let update = DeltaMessage::decode(
            &json!({
                "clientId": "b",
                "type": "update",
                "element": {"id": "e1", "type": "circle", "x": 1, "y": 2, "radius": 3,
                            "color": "red", "lineWidth": 1}
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(update.delta.kind(), DeltaKind::Update);
        assert_eq!(update.client_id.as_str(), "b");
    }

    #[test]
    fn rejects_malformed_messages() {
        for raw in [
            "",
            "not json",
            "[]",
            r#"{"type":"delete","id":"e1"}"#,
            r#"{"clientId":"b","type":"rename","id":"e1"}"#,
            r#"{"clientId":"b","type":"add"}"#,
            r#"{"clientId":"b","type":"delete"}"#,
            r#"{"clientId":"b","type":"add","element":{"id":"x","type":"blob"}}"#,
        ] {
            assert!(DeltaMessage::decode(raw).is_err(), "accepted {raw:?}");
        }
    }
}
