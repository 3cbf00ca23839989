//! Generation request options and errors for the conversational model.
//!
//! These are provider-agnostic. Backend-specific wire types live in
//! courier-infra.

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Default upper bound on generated reply length, in tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Upper bound on the generated reply length. Must be positive.
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    pub fn new(max_output_tokens: u32) -> Self {
        Self {
            max_output_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Reject options the remote API would refuse.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_output_tokens == 0 {
            return Err(ClientError::InvalidRequest(
                "max_output_tokens must be positive".to_string(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ClientError::InvalidRequest(format!(
                    "temperature must be within 0.0..=2.0, got {t}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_TOKENS)
    }
}

/// Errors from a conversational model call.
///
/// Every variant renders a human-readable cause, which ends up in the
/// error reply pushed to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("authentication failed")]
    Authentication,

    #[error("remote error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("response blocked: {0}")]
    Blocked(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
