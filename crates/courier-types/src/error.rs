use std::time::Duration;

use thiserror::Error;

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("user id must not be empty")]
    EmptyUserId,
}

/// Errors from pushing a reply back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("push timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("push rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("push authentication failed")]
    Authentication,

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The reply was never attempted because the relay had no capacity left.
    #[error("reply dropped: {0}")]
    Dropped(String),
}

impl DeliveryError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Network(_) | DeliveryError::Timeout(_) => true,
            DeliveryError::Rejected { status, .. } => *status == 429 || *status >= 500,
            DeliveryError::Authentication
            | DeliveryError::InvalidRecipient(_)
            | DeliveryError::Dropped(_) => false,
        }
    }
}

/// Errors from inbound webhook authenticity checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,

    #[error("signature is not valid base64")]
    Malformed,

    #[error("signature verification failed")]
    Mismatch,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Errors returned to the caller of `dispatch`.
///
/// None of these reach the webhook acknowledgment: they are logged by the
/// inbound handler and the user is answered through the outbound path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("dispatcher saturated ({pending} exchanges pending)")]
    Overloaded { pending: usize },

    #[error("dispatcher is shutting down")]
    ShuttingDown,
}
