//! Push notification pass-through.
//!
//! The proxy does not render notifications. It decodes the push payload and
//! forwards it to an injected [`Notifier`] collaborator; everything visual
//! is that collaborator's problem.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

fn default_title() -> String {
    "Notification".to_owned()
}

fn default_body() -> String {
    "You have a new notification".to_owned()
}

/// A decoded push payload.
///
/// Pushes arrive as loosely structured JSON; missing fields fall back to
/// generic defaults rather than failing, because a push with an unreadable
/// payload should still surface *something* to the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushPayload {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Opaque application data carried through to the notifier untouched.
    #[serde(default)]
    pub data: Value,
}

impl PushPayload {
    /// Decodes a raw push body, falling back to defaults when it is empty
    /// or malformed.
    pub fn decode(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(raw).unwrap_or_else(|error| {
            warn!(%error, "push payload undecodable, using defaults");
            Self::default()
        })
    }
}

impl Default for PushPayload {
    fn default() -> Self {
        Self {
            title: default_title(),
            body: default_body(),
            icon: None,
            data: Value::Null,
        }
    }
}

/// The notification-display collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Displays a notification for a decoded push payload.
    async fn show(&self, payload: PushPayload);

    /// Reacts to the user activating a previously shown notification; `data`
    /// is whatever the application attached to the notification.
    async fn activated(&self, data: Value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_payload_decodes() {
        let raw = br#"{"title":"Hearing moved","body":"New date: 2026-09-12","icon":"/icon.png","data":{"case":42}}"#;
        let payload = PushPayload::decode(raw);
        assert_eq!(payload.title, "Hearing moved");
        assert_eq!(payload.body, "New date: 2026-09-12");
        assert_eq!(payload.icon.as_deref(), Some("/icon.png"));
        assert_eq!(payload.data, json!({"case": 42}));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let payload = PushPayload::decode(br#"{"title":"Only a title"}"#);
        assert_eq!(payload.title, "Only a title");
        assert_eq!(payload.body, default_body());
        assert_eq!(payload.icon, None);
        assert_eq!(payload.data, Value::Null);
    }

    #[test]
    fn empty_and_malformed_payloads_default() {
        assert_eq!(PushPayload::decode(b""), PushPayload::default());
        assert_eq!(PushPayload::decode(b"not json"), PushPayload::default());
    }
}
