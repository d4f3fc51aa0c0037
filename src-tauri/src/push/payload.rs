//! Notification data as this subsystem sees it, after the raw platform shapes
//! have been mapped away in [`crate::push::events`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key stamped on every banner we synthesize locally.
pub const MIRROR_MARKER: &str = "_quotepad_mirrored";

pub const TYPE_KEY: &str = "type";
pub const TICKET_ID_KEY: &str = "ticket_id";
pub const QUOTE_ID_KEY: &str = "quote_id";

/// Opaque identifier the runtime assigns to one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryIdentity(String);

impl DeliveryIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `type` tag of a payload. Open-ended: anything unrecognised is kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    SupportMessage,
    QuoteCreated,
    Other(String),
    Missing,
}

impl NotificationKind {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => NotificationKind::Missing,
            Some("support_message") => NotificationKind::SupportMessage,
            Some("quote_created") => NotificationKind::QuoteCreated,
            Some(other) => NotificationKind::Other(other.to_string()),
        }
    }
}

/// Key/value map attached to a notification. Never validated: unknown keys
/// are carried along untouched and missing keys simply read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPayload(Map<String, Value>);

impl NotificationPayload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a payload from any JSON value. Non-objects become empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> NotificationKind {
        NotificationKind::parse(self.0.get(TYPE_KEY).and_then(Value::as_str))
    }

    /// The raw `type` string, if any.
    pub fn type_tag(&self) -> Option<&str> {
        self.0
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Reads a string-castable value. Strings are trimmed, numbers and bools
    /// render as text, blanks count as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn ticket_id(&self) -> Option<String> {
        self.get_str(TICKET_ID_KEY)
    }

    pub fn quote_id(&self) -> Option<String> {
        self.get_str(QUOTE_ID_KEY)
    }

    pub fn is_mirrored(&self) -> bool {
        self.0.contains_key(MIRROR_MARKER)
    }

    /// Copy of this payload carrying the mirror marker.
    pub fn mirrored(&self) -> Self {
        self.clone().with(MIRROR_MARKER, true)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// What arrived: the visible text (if any) plus the data payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub payload: NotificationPayload,
}

impl NotificationContent {
    /// True when the platform would have something to draw on its own.
    pub fn has_visible_text(&self) -> bool {
        let visible = |s: &Option<String>| s.as_deref().is_some_and(|t| !t.trim().is_empty());
        visible(&self.title) || visible(&self.body)
    }
}

/// A notification observed while the process is alive.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedNotification {
    pub identity: DeliveryIdentity,
    pub content: NotificationContent,
    /// Do-not-disturb or an equivalent mode is active on the device.
    pub alert_suppressed: bool,
}

/// A user interaction with a delivered notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationResponse {
    pub identity: DeliveryIdentity,
    pub payload: NotificationPayload,
    pub action: Option<String>,
}
