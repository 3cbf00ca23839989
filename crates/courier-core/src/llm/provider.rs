//! GenerativeModel trait definition.
//!
//! This is the remote-capability abstraction that every conversational model
//! backend implements. Uses RPITIT for `generate`.

use courier_types::llm::{ClientError, GenerationOptions};
use courier_types::session::Turn;

/// Trait for conversational model backends (Gemini, test fakes, ...).
///
/// A backend is stateless with respect to conversations: it receives the
/// prior turns and the new input on every call and returns the generated
/// text. History bookkeeping is done by
/// [`ConversationClient`](super::client::ConversationClient).
///
/// Implementations live in courier-infra (e.g., `GeminiModel`).
pub trait GenerativeModel: Send + Sync {
    /// Human-readable backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Model identifier sent to the backend.
    fn model(&self) -> &str;

    /// Generate a reply to `input` given the prior `history`.
    fn generate(
        &self,
        history: &[Turn],
        input: &str,
        options: &GenerationOptions,
    ) -> impl std::future::Future<Output = Result<String, ClientError>> + Send;
}
