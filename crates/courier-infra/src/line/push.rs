//! LinePushNotifier -- [`OutboundNotifier`] over the LINE push API.
//!
//! Replies are sent with `POST /v2/bot/message/push`, not the reply API:
//! the reply token expires long before a slow model call may finish.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use courier_core::delivery::OutboundNotifier;
use courier_types::error::DeliveryError;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.line.me";

/// Maximum characters in a single LINE text message.
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Error body: `{"message": "...", "details": [...]}`.
#[derive(Debug, Deserialize)]
struct LineErrorBody {
    message: String,
}

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn push_request<'a>(user_id: &'a str, text: &'a str) -> PushRequest<'a> {
    PushRequest {
        to: user_id,
        messages: [TextMessage {
            kind: "text",
            text: truncate_text(text, MAX_TEXT_CHARS),
        }],
    }
}

fn map_push_status(status: u16, body: &str) -> DeliveryError {
    let message = serde_json::from_str::<LineErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());
    match status {
        401 | 403 => DeliveryError::Authentication,
        _ => DeliveryError::Rejected { status, message },
    }
}

/// Pushes text messages to LINE users.
pub struct LinePushNotifier {
    client: reqwest::Client,
    access_token: SecretString,
    base_url: String,
}

impl LinePushNotifier {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/v2/bot/message/push", self.base_url.trim_end_matches('/'))
    }
}

impl OutboundNotifier for LinePushNotifier {
    fn name(&self) -> &str {
        "line"
    }

    async fn push(&self, user_id: &str, text: &str) -> Result<(), DeliveryError> {
        if user_id.is_empty() {
            return Err(DeliveryError::InvalidRecipient("empty user id".to_string()));
        }

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&push_request(user_id, text))
            .send()
            .await
            .map_err(|e| DeliveryError::Network(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_push_status(status.as_u16(), &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_request_shape() {
        let json = serde_json::to_value(push_request("U1", "Hi there")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to": "U1",
                "messages": [{"type": "text", "text": "Hi there"}]
            })
        );
    }

    #[test]
    fn test_truncate_text_on_char_boundary() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello", 5), "hello");
        assert_eq!(truncate_text("hello", 3), "hel");
        assert_eq!(truncate_text("こんにちは", 2), "こん");
        assert_eq!(truncate_text("", 0), "");
    }

    #[test]
    fn test_long_reply_truncated_to_limit() {
        let long = "あ".repeat(MAX_TEXT_CHARS + 10);
        let request = push_request("U1", &long);
        assert_eq!(request.messages[0].text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_map_push_status() {
        assert_eq!(map_push_status(401, ""), DeliveryError::Authentication);
        assert_eq!(
            map_push_status(400, r#"{"message":"The request body has 1 error(s)","details":[]}"#),
            DeliveryError::Rejected {
                status: 400,
                message: "The request body has 1 error(s)".to_string()
            }
        );
        let throttled = map_push_status(429, "");
        assert!(throttled.is_retryable());
    }

    #[test]
    fn test_url_and_name() {
        let notifier =
            LinePushNotifier::new(SecretString::from("token")).with_base_url("http://localhost:1/");
        assert_eq!(notifier.url(), "http://localhost:1/v2/bot/message/push");
        assert_eq!(notifier.name(), "line");
    }

    #[tokio::test]
    async fn test_empty_recipient_rejected_without_request() {
        let notifier = LinePushNotifier::new(SecretString::from("token"));
        assert!(matches!(
            notifier.push("", "Hi").await,
            Err(DeliveryError::InvalidRecipient(_))
        ));
    }
}
