//! GeminiModel -- concrete [`GenerativeModel`] for the Gemini REST API.
//!
//! Sends the session history plus the new user turn to
//! `/v1beta/models/{model}:generateContent`. The call is stateless on the
//! Gemini side: context is whatever history the caller passes in.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the request header.

use secrecy::{ExposeSecret, SecretString};
use tracing::Span;

use courier_core::llm::GenerativeModel;
use courier_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_USAGE_INPUT_TOKENS, GEN_AI_USAGE_OUTPUT_TOKENS,
    PROVIDER_GEMINI,
};
use courier_types::llm::{ClientError, GenerationOptions};
use courier_types::session::{Turn, TurnRole};

use super::types::{
    GeminiContent, GeminiErrorBody, GeminiGenerationConfig, GenerateContentRequest,
    GenerateContentResponse,
};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini generative model backend.
///
/// Timeouts are not configured on the HTTP client: the conversation client
/// bounds every call.
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    system_instruction: Option<String>,
}

// No Debug derive: keeps the struct out of logs entirely.

impl GeminiModel {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            system_instruction: None,
        }
    }

    /// Override the base URL (proxies, regional endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Attach a system instruction sent with every request.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction.filter(|s| !s.trim().is_empty());
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Convert history plus the new input into a request body.
    fn to_gemini_request(
        &self,
        history: &[Turn],
        input: &str,
        options: &GenerationOptions,
    ) -> GenerateContentRequest {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|turn| GeminiContent::text(Some(role_name(turn.role)), &turn.text))
            .collect();
        contents.push(GeminiContent::text(Some(role_name(TurnRole::User)), input));

        GenerateContentRequest {
            contents,
            system_instruction: self
                .system_instruction
                .as_deref()
                .map(|text| GeminiContent::text(None, text)),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: options.max_output_tokens,
                temperature: options.temperature,
            },
        }
    }
}

fn role_name(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    }
}

/// Map a non-2xx response to a [`ClientError`].
fn map_error_status(status: u16, body: &str) -> ClientError {
    let message = serde_json::from_str::<GeminiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        401 | 403 => ClientError::Authentication,
        429 => ClientError::Quota(message),
        _ => ClientError::Remote { status, message },
    }
}

/// Pull the reply text out of a successful response.
fn extract_reply(response: &GenerateContentResponse) -> Result<String, ClientError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(ClientError::Blocked(reason.to_string()));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| ClientError::MalformedResponse("response has no candidates".to_string()))?;

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                ClientError::Blocked(reason.to_string())
            }
            _ => ClientError::MalformedResponse("candidate has no text parts".to_string()),
        });
    }
    Ok(text)
}

fn record_usage(response: &GenerateContentResponse) {
    let span = Span::current();
    if let Some(usage) = &response.usage_metadata {
        if let Some(n) = usage.prompt_token_count {
            span.record(GEN_AI_USAGE_INPUT_TOKENS, n);
        }
        if let Some(n) = usage.candidates_token_count {
            span.record(GEN_AI_USAGE_OUTPUT_TOKENS, n);
        }
    }
    if let Some(reason) = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.as_deref())
    {
        span.record(GEN_AI_RESPONSE_FINISH_REASONS, reason);
    }
}

impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        PROVIDER_GEMINI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        history: &[Turn],
        input: &str,
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        let body = self.to_gemini_request(history, input, options);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "gemini returned an error status");
            return Err(map_error_status(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ClientError::MalformedResponse(format!("failed to parse response: {e}")))?;

        record_usage(&parsed);
        extract_reply(&parsed)
    }
}
