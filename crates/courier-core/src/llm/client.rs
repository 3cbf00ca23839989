//! ConversationClient -- history-aware wrapper around a [`GenerativeModel`].
//!
//! The client owns the session contract so no backend can break it:
//! the model call is bounded by a timeout, and the session history is only
//! extended (user turn, then model turn) after a fully successful call.

use std::time::Duration;

use tracing::{Instrument, debug, field, info_span};

use courier_types::llm::{ClientError, GenerationOptions};
use courier_types::session::Session;

use super::provider::GenerativeModel;

/// Sends messages to a model on behalf of a session.
pub struct ConversationClient<M: GenerativeModel> {
    model: M,
    timeout: Duration,
}

impl<M: GenerativeModel> ConversationClient<M> {
    /// Wrap `model`, bounding every call by `timeout`.
    pub fn new(model: M, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `input_text` with the session's prior turns as context.
    ///
    /// On success the exchange is appended to `session` and the generated
    /// text is returned. On any failure, including a timeout or invalid
    /// options, `session` is left untouched.
    ///
    /// Requires `&mut Session`, so calls on one session cannot interleave.
    pub async fn send(
        &self,
        session: &mut Session,
        input_text: &str,
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        options.validate()?;

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.model.name(),
            gen_ai.request.model = self.model.model(),
            gen_ai.request.max_tokens = options.max_output_tokens,
            gen_ai.request.temperature = ?options.temperature,
            gen_ai.usage.input_tokens = field::Empty,
            gen_ai.usage.output_tokens = field::Empty,
            gen_ai.response.finish_reasons = field::Empty,
            history_turns = session.len(),
        );

        let call = self.model.generate(session.history(), input_text, options);
        let output = match tokio::time::timeout(self.timeout, call.instrument(span)).await {
            Ok(result) => result?,
            Err(_) => return Err(ClientError::Timeout(self.timeout)),
        };

        session.record_exchange(input_text, output.clone());
        debug!(
            user_id = session.user_id(),
            turns = session.len(),
            "recorded exchange"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use courier_types::session::Turn;

    use super::*;

    /// Scripted backend: pops replies in order and records what it was sent.
    struct ScriptedModel {
        replies: Mutex<Vec<Result<String, ClientError>>>,
        seen: Mutex<Vec<(Vec<Turn>, String)>>,
        delay: Option<Duration>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, ClientError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(vec![Ok("late".to_string())])
            }
        }
    }

    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn generate(
            &self,
            history: &[Turn],
            input: &str,
            _options: &GenerationOptions,
        ) -> Result<String, ClientError> {
            self.seen
                .lock()
                .unwrap()
                .push((history.to_vec(), input.to_string()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ClientError::MalformedResponse("script exhausted".into())))
        }
    }

    #[tokio::test]
    async fn test_success_appends_user_then_model() {
        let client = ConversationClient::new(
            ScriptedModel::new(vec![Ok("Hi there".to_string())]),
            Duration::from_secs(5),
        );
        let mut session = Session::new("U1");

        let reply = client
            .send(&mut session, "Hello", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(reply, "Hi there");
        assert_eq!(
            session.history(),
            &[Turn::user("Hello"), Turn::model("Hi there")]
        );
    }

    #[tokio::test]
    async fn test_prior_history_is_sent_as_context() {
        let client = ConversationClient::new(
            ScriptedModel::new(vec![
                Ok("Hi there".to_string()),
                Ok("You said Hello".to_string()),
            ]),
            Duration::from_secs(5),
        );
        let mut session = Session::new("U1");
        let options = GenerationOptions::default();

        client.send(&mut session, "Hello", &options).await.unwrap();
        client
            .send(&mut session, "What did I just say?", &options)
            .await
            .unwrap();

        let seen = client.model().seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.is_empty());
        assert_eq!(
            seen[1].0,
            vec![Turn::user("Hello"), Turn::model("Hi there")]
        );
        assert_eq!(seen[1].1, "What did I just say?");
        assert_eq!(session.len(), 4);
    }

    #[tokio::test]
    async fn test_failure_leaves_history_untouched() {
        let client = ConversationClient::new(
            ScriptedModel::new(vec![
                Ok("first".to_string()),
                Err(ClientError::Quota("exhausted".to_string())),
            ]),
            Duration::from_secs(5),
        );
        let mut session = Session::new("U1");
        let options = GenerationOptions::default();
        client.send(&mut session, "one", &options).await.unwrap();

        let err = client.send(&mut session, "two", &options).await.unwrap_err();

        assert_eq!(err, ClientError::Quota("exhausted".to_string()));
        assert_eq!(session.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_client_error_without_mutation() {
        let client = ConversationClient::new(
            ScriptedModel::slow(Duration::from_secs(120)),
            Duration::from_secs(30),
        );
        let mut session = Session::new("U1");

        let err = client
            .send(&mut session, "Hello", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Timeout(Duration::from_secs(30)));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_call() {
        let client = ConversationClient::new(
            ScriptedModel::new(vec![Ok("unused".to_string())]),
            Duration::from_secs(5),
        );
        let mut session = Session::new("U1");

        let err = client
            .send(&mut session, "Hello", &GenerationOptions::new(0))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(client.model().seen.lock().unwrap().is_empty());
        assert!(session.is_empty());
    }
}
