//! LINE Messaging API: inbound webhook handling and outbound push.

pub mod events;
pub mod push;
pub mod signature;

pub use events::{InboundText, WebhookPayload};
pub use push::LinePushNotifier;
pub use signature::{SIGNATURE_HEADER, SignatureVerifier};

use courier_types::error::SignatureError;

/// Errors from accepting a webhook request.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("malformed webhook payload: {0}")]
    Payload(String),
}

/// Verify the signature over the raw body, then parse it.
///
/// Parsing never happens for a request that fails verification.
pub fn parse_verified(
    verifier: &SignatureVerifier,
    body: &[u8],
    signature: Option<&str>,
) -> Result<WebhookPayload, WebhookError> {
    verifier.verify(body, signature)?;
    WebhookPayload::from_slice(body).map_err(|e| WebhookError::Payload(e.to_string()))
}
