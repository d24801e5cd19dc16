//! Inbound CMS hook events
//!
//! The CMS emits `{collection}.items.{create|update|delete}` events. Each
//! event carries the affected keys and a payload whose shape depends on the
//! action:
//!
//! ```text
//! forms.items.create   payload = the new item            key  = new id
//! pages.items.update   payload = the changed fields      keys = updated ids
//! pages.items.delete   payload = [ids] (filter phase)    keys = deleted ids
//! ```
//!
//! [`HookEvent`] normalises those shapes so handlers only deal with a list
//! of [`ItemKey`]s and a JSON payload.

use crate::core::error::AutomationError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

fn event_name_regex() -> &'static Regex {
    static EVENT_NAME: OnceLock<Regex> = OnceLock::new();
    EVENT_NAME.get_or_init(|| {
        Regex::new(r"^(?P<collection>[A-Za-z0-9_\-]+)\.items\.(?P<action>create|update|delete)$")
            .expect("event name pattern is valid")
    })
}

/// Primary key of a CMS item
///
/// Collections may use integer or string (uuid) keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Int(i64),
    Text(String),
}

impl ItemKey {
    /// Parse a key read back as text from the database
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(ItemKey::Int)
            .unwrap_or_else(|_| ItemKey::Text(raw.to_string()))
    }

    /// Same item, comparing keys the way the database does (`id::text`)
    ///
    /// The CMS may send an integer primary key as a string, so `Int(1)`
    /// matches `Text("1")`.
    pub fn matches(&self, other: &ItemKey) -> bool {
        match (self, other) {
            (ItemKey::Int(a), ItemKey::Int(b)) => a == b,
            (ItemKey::Text(a), ItemKey::Text(b)) => a == b,
            (ItemKey::Int(a), ItemKey::Text(b)) | (ItemKey::Text(b), ItemKey::Int(a)) => {
                a.to_string() == *b
            }
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Int(key) => write!(f, "{}", key),
            ItemKey::Text(key) => f.write_str(key),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(key: i64) -> Self {
        ItemKey::Int(key)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        ItemKey::Text(key.to_string())
    }
}

/// Item lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    Create,
    Update,
    Delete,
}

impl HookAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookAction::Create => "create",
            HookAction::Update => "update",
            HookAction::Delete => "delete",
        }
    }
}

/// Parsed `{collection}.items.{action}` event name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookEventName {
    pub collection: String,
    pub action: HookAction,
}

impl HookEventName {
    pub fn new(collection: impl Into<String>, action: HookAction) -> Self {
        Self {
            collection: collection.into(),
            action,
        }
    }
}

impl fmt::Display for HookEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.items.{}", self.collection, self.action.as_str())
    }
}

impl FromStr for HookEventName {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = event_name_regex()
            .captures(s)
            .ok_or_else(|| AutomationError::UnknownEvent(s.to_string()))?;

        let action = match &captures["action"] {
            "create" => HookAction::Create,
            "update" => HookAction::Update,
            _ => HookAction::Delete,
        };

        Ok(Self::new(&captures["collection"], action))
    }
}

/// Body of an inbound hook delivery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookRequest {
    #[serde(default)]
    pub keys: Vec<ItemKey>,
    #[serde(default)]
    pub key: Option<ItemKey>,
    #[serde(default)]
    pub payload: Value,
}

/// A normalised hook event
#[derive(Debug, Clone, Serialize)]
pub struct HookEvent {
    #[serde(serialize_with = "serialize_display")]
    pub name: HookEventName,
    pub keys: Vec<ItemKey>,
    pub payload: Value,
}

fn serialize_display<S: serde::Serializer>(
    name: &HookEventName,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(name)
}

impl HookEvent {
    pub fn new(name: HookEventName, keys: Vec<ItemKey>, payload: Value) -> Self {
        Self {
            name,
            keys,
            payload,
        }
    }

    /// Build an event from a delivery body
    ///
    /// `key` is folded into `keys`. A delete delivered in its filter phase
    /// only carries the keys as its payload, so an array payload is read as
    /// keys when none were given.
    pub fn from_request(name: HookEventName, request: HookRequest) -> Self {
        let mut keys = request.keys;
        if let Some(key) = request.key
            && !keys.contains(&key)
        {
            keys.push(key);
        }

        if keys.is_empty()
            && name.action == HookAction::Delete
            && let Ok(from_payload) = serde_json::from_value::<Vec<ItemKey>>(request.payload.clone())
        {
            keys = from_payload;
        }

        Self::new(name, keys, request.payload)
    }

    /// Event name as the CMS spells it, e.g. `pages.items.update`
    pub fn event_name(&self) -> String {
        self.name.to_string()
    }

    /// Read a string field of the payload, treating `""` as absent
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload
            .get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Envelope wrapping a hook event with delivery metadata
#[derive(Debug, Clone, Serialize)]
pub struct HookEnvelope {
    /// Unique delivery ID
    pub id: Uuid,
    /// When the delivery was received
    pub received_at: DateTime<Utc>,
    /// The actual event
    pub event: HookEvent,
}

impl HookEnvelope {
    pub fn new(event: HookEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_event_name() {
        let name: HookEventName = "pages.items.update".parse().unwrap();
        assert_eq!(name.collection, "pages");
        assert_eq!(name.action, HookAction::Update);
        assert_eq!(name.to_string(), "pages.items.update");
    }

    #[test]
    fn test_parse_event_name_rejects_other_shapes() {
        assert!("pages.update".parse::<HookEventName>().is_err());
        assert!("pages.items.sort".parse::<HookEventName>().is_err());
        assert!("auth.login".parse::<HookEventName>().is_err());
    }

    #[test]
    fn test_item_key_untagged() {
        let keys: Vec<ItemKey> = serde_json::from_value(json!([1, "a1b2"])).unwrap();
        assert_eq!(keys, vec![ItemKey::Int(1), ItemKey::Text("a1b2".into())]);
        assert_eq!(ItemKey::parse("42"), ItemKey::Int(42));
        assert_eq!(ItemKey::parse("x-1"), ItemKey::Text("x-1".into()));
    }

    #[test]
    fn test_item_key_matches_by_text() {
        assert!(ItemKey::Int(1).matches(&ItemKey::Text("1".into())));
        assert!(ItemKey::Text("1".into()).matches(&ItemKey::Int(1)));
        assert!(ItemKey::Text("a1b2".into()).matches(&ItemKey::Text("a1b2".into())));
        assert!(!ItemKey::Int(1).matches(&ItemKey::Text("01".into())));
        assert!(!ItemKey::Int(1).matches(&ItemKey::Int(2)));
    }

    #[test]
    fn test_from_request_folds_single_key() {
        let event = HookEvent::from_request(
            "forms.items.create".parse().unwrap(),
            HookRequest {
                keys: vec![],
                key: Some(ItemKey::Int(3)),
                payload: json!({"key": "contact"}),
            },
        );
        assert_eq!(event.keys, vec![ItemKey::Int(3)]);
    }

    #[test]
    fn test_from_request_reads_delete_keys_from_payload() {
        let event = HookEvent::from_request(
            "pages.items.delete".parse().unwrap(),
            HookRequest {
                payload: json!([7, 8]),
                ..Default::default()
            },
        );
        assert_eq!(event.keys, vec![ItemKey::Int(7), ItemKey::Int(8)]);
    }

    #[test]
    fn test_payload_str_ignores_empty() {
        let event = HookEvent::new(
            "pages.items.update".parse().unwrap(),
            vec![],
            json!({"status": "", "permalink": "/blog/"}),
        );
        assert_eq!(event.payload_str("status"), None);
        assert_eq!(event.payload_str("permalink"), Some("/blog/"));
    }

    #[test]
    fn test_envelope_has_metadata() {
        let envelope = HookEnvelope::new(HookEvent::new(
            "pages.items.create".parse().unwrap(),
            vec![],
            json!({}),
        ));
        assert!(!envelope.id.is_nil());
        assert!(envelope.received_at <= Utc::now());
    }
}
