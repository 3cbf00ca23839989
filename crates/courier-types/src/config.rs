//! Relay configuration types for Courier.
//!
//! `RelayConfig` is the optional `courier.toml` tunables file. Every field has
//! a default, so an empty file (or no file) yields a working configuration.
//! Secrets are never part of this file; they come from the environment.

use serde::{Deserialize, Serialize};

use std::time::Duration;

use crate::llm::{DEFAULT_MAX_OUTPUT_TOKENS, GenerationOptions};

/// Upper bound accepted for `push_retry_backoff_ms`.
pub const MAX_PUSH_RETRY_BACKOFF_MS: u64 = 60_000;

/// Tunables for the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Gemini model identifier.
    pub model: String,
    /// Base URL of the generative-language API.
    pub gemini_base_url: String,
    /// Base URL of the messaging platform API (push endpoint host).
    pub line_api_base_url: String,

    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
    /// System instruction sent with every model call.
    pub system_instruction: Option<String>,

    /// Upper bound on one model call.
    pub request_timeout_secs: u64,
    /// Upper bound on one push call.
    pub push_timeout_secs: u64,

    /// Exchanges allowed to talk to the model at the same time.
    pub max_concurrent_exchanges: usize,
    /// Exchanges accepted but not yet delivered. Beyond this, new messages
    /// get the busy reply.
    pub max_pending_exchanges: usize,
    /// Busy replies allowed in flight at once. Beyond this, busy replies are
    /// dropped and reported to the delivery-failure hook.
    pub max_busy_replies: usize,

    /// Maximum sessions kept in memory (least recently used are evicted).
    pub session_capacity: Option<usize>,
    /// Sessions idle longer than this are dropped by the sweeper.
    pub session_idle_ttl_secs: Option<u64>,
    pub sweep_interval_secs: u64,

    /// Extra push attempts after a retryable delivery failure.
    pub push_retries: u32,
    pub push_retry_backoff_ms: u64,

    /// How long a webhook event id is remembered for redelivery detection.
    pub redelivery_window_secs: u64,

    /// Prefix of the reply sent when the model call fails.
    pub error_reply_prefix: String,
    /// Reply sent when the relay is saturated.
    pub busy_reply: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash-latest".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            line_api_base_url: "https://api.line.me".to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: None,
            system_instruction: None,
            request_timeout_secs: 60,
            push_timeout_secs: 15,
            max_concurrent_exchanges: 32,
            max_pending_exchanges: 256,
            max_busy_replies: 16,
            session_capacity: Some(10_000),
            session_idle_ttl_secs: Some(24 * 60 * 60),
            sweep_interval_secs: 300,
            push_retries: 0,
            push_retry_backoff_ms: 500,
            redelivery_window_secs: 600,
            error_reply_prefix:
                "Sorry, an error occurred while getting a response from Gemini".to_string(),
            busy_reply: "Too many requests are in flight right now. Please try again shortly."
                .to_string(),
        }
    }
}

impl RelayConfig {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        self.generation_options()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.request_timeout_secs == 0 || self.push_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        if self.max_concurrent_exchanges == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_exchanges must be positive".to_string(),
            ));
        }
        if self.max_pending_exchanges < self.max_concurrent_exchanges {
            return Err(ConfigError::Invalid(format!(
                "max_pending_exchanges ({}) must be at least max_concurrent_exchanges ({})",
                self.max_pending_exchanges, self.max_concurrent_exchanges
            )));
        }
        if self.max_busy_replies == 0 {
            return Err(ConfigError::Invalid(
                "max_busy_replies must be positive".to_string(),
            ));
        }
        if self.push_retry_backoff_ms > MAX_PUSH_RETRY_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "push_retry_backoff_ms must be at most {MAX_PUSH_RETRY_BACKOFF_MS}"
            )));
        }
        if self.session_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "session_capacity must be positive when set".to_string(),
            ));
        }
        if self.session_idle_ttl_secs == Some(0) || self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "session_idle_ttl_secs and sweep_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    pub fn session_idle_ttl(&self) -> Option<Duration> {
        self.session_idle_ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn push_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.push_retry_backoff_ms)
    }

    pub fn redelivery_window(&self) -> Duration {
        Duration::from_secs(self.redelivery_window_secs)
    }
}

/// Errors from loading configuration or secrets.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_default_values() {
        let config = RelayConfig::default();
        assert_eq!(config.model, "gemini-1.5-flash-latest");
        assert_eq!(config.max_output_tokens, 2048);
        assert_eq!(config.push_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relay_config_deserialize_empty_uses_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_relay_config_deserialize_with_values() {
        let toml_str = r#"
model = "gemini-2.0-flash"
max_output_tokens = 512
temperature = 0.4
session_capacity = 100
max_concurrent_exchanges = 4
max_pending_exchanges = 8
"#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_output_tokens, 512);
        assert_eq!(config.temperature, Some(0.4));
        assert_eq!(config.session_capacity, Some(100));
        assert_eq!(config.max_concurrent_exchanges, 4);
        // Untouched fields keep defaults
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_relay_config_rejects_unknown_fields() {
        assert!(toml::from_str::<RelayConfig>("max_tokens = 5").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_tokens() {
        let config = RelayConfig {
            max_output_tokens: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_pending_below_concurrency() {
        let config = RelayConfig {
            max_concurrent_exchanges: 8,
            max_pending_exchanges: 4,
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_busy_replies_and_backoff() {
        let no_busy = RelayConfig {
            max_busy_replies: 0,
            ..RelayConfig::default()
        };
        assert!(no_busy.validate().is_err());

        let huge_backoff = RelayConfig {
            push_retry_backoff_ms: u64::MAX,
            ..RelayConfig::default()
        };
        assert!(matches!(huge_backoff.validate(), Err(ConfigError::Invalid(_))));

        let at_cap = RelayConfig {
            push_retry_backoff_ms: MAX_PUSH_RETRY_BACKOFF_MS,
            ..RelayConfig::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = RelayConfig {
            session_capacity: Some(0),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());

        let unbounded = RelayConfig {
            session_capacity: None,
            ..RelayConfig::default()
        };
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn test_duration_helpers() {
        let config = RelayConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.session_idle_ttl(), Some(Duration::from_secs(86_400)));
        assert_eq!(config.generation_options().max_output_tokens, 2048);
    }
}
