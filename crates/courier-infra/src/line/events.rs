//! LINE Messaging API webhook payload.
//!
//! Only the fields the relay acts on are modeled; everything else in the
//! payload is ignored. Event and message types are kept as strings so new
//! LINE event kinds never fail deserialization.

use serde::Deserialize;

/// Top-level webhook body: `{ "destination": ..., "events": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub webhook_event_id: Option<String>,
    pub timestamp: Option<i64>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
    pub delivery_context: Option<DeliveryContext>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

/// A text message from an identified user, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText<'a> {
    pub event_id: Option<&'a str>,
    pub user_id: &'a str,
    pub text: &'a str,
    pub redelivered: bool,
}

impl WebhookEvent {
    /// The event as an inbound text message, if it is one.
    ///
    /// Requires event type `message`, message type `text` and a source
    /// carrying a `userId`.
    pub fn as_text_message(&self) -> Option<InboundText<'_>> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref().filter(|m| m.message_type == "text")?;
        let user_id = self
            .source
            .as_ref()
            .and_then(|s| s.user_id.as_deref())
            .filter(|id| !id.is_empty())?;

        Some(InboundText {
            event_id: self.webhook_event_id.as_deref(),
            user_id,
            text: message.text.as_deref().unwrap_or_default(),
            redelivered: self
                .delivery_context
                .as_ref()
                .is_some_and(|c| c.is_redelivery),
        })
    }
}

impl WebhookPayload {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// All actionable text messages, in payload order.
    pub fn text_messages(&self) -> impl Iterator<Item = InboundText<'_>> {
        self.events.iter().filter_map(WebhookEvent::as_text_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "destination": "Uabcdef",
        "events": [
            {
                "type": "message",
                "mode": "active",
                "timestamp": 1700000000000,
                "webhookEventId": "01HXYZ",
                "deliveryContext": {"isRedelivery": false},
                "replyToken": "reply-token",
                "source": {"type": "user", "userId": "U1"},
                "message": {"id": "100", "type": "text", "text": "Hello", "quoteToken": "q"}
            },
            {
                "type": "message",
                "webhookEventId": "01HXZA",
                "source": {"type": "user", "userId": "U1"},
                "message": {"id": "101", "type": "sticker", "packageId": "1", "stickerId": "2"}
            },
            {
                "type": "follow",
                "webhookEventId": "01HXZB",
                "source": {"type": "user", "userId": "U2"}
            },
            {
                "type": "message",
                "webhookEventId": "01HXZC",
                "source": {"type": "group", "groupId": "G1"},
                "message": {"id": "102", "type": "text", "text": "no user"}
            },
            {
                "type": "message",
                "webhookEventId": "01HXZD",
                "deliveryContext": {"isRedelivery": true},
                "source": {"type": "user", "userId": "U3"},
                "message": {"id": "103", "type": "text", "text": "again"}
            }
        ]
    }"#;

    #[test]
    fn test_text_messages_filters_non_text_events() {
        let payload = WebhookPayload::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(payload.destination, "Uabcdef");
        assert_eq!(payload.events.len(), 5);

        let texts: Vec<InboundText<'_>> = payload.text_messages().collect();
        assert_eq!(
            texts,
            vec![
                InboundText {
                    event_id: Some("01HXYZ"),
                    user_id: "U1",
                    text: "Hello",
                    redelivered: false,
                },
                InboundText {
                    event_id: Some("01HXZD"),
                    user_id: "U3",
                    text: "again",
                    redelivered: true,
                },
            ]
        );
    }

    #[test]
    fn test_empty_events_is_valid() {
        // LINE's webhook URL verification sends an empty event list.
        let payload = WebhookPayload::from_slice(br#"{"destination":"U0","events":[]}"#).unwrap();
        assert_eq!(payload.text_messages().count(), 0);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(WebhookPayload::from_slice(b"{not json").is_err());
        assert!(WebhookPayload::from_slice(br#"{"events": [{"no_type": 1}]}"#).is_err());
    }
}
