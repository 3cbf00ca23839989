//! Application state wiring the relay together.
//!
//! `AppState` is generic over the model backend and the notifier so the HTTP
//! layer can be exercised with in-memory fakes; `ConcreteState` pins it to
//! Gemini and LINE for the running server.

use std::sync::Arc;
use std::time::Instant;

use courier_core::delivery::OutboundNotifier;
use courier_core::dispatch::{DispatchSettings, Dispatcher, RedeliveryGuard};
use courier_core::llm::{ConversationClient, GenerativeModel};
use courier_core::session::{RetentionPolicy, SessionStore};
use courier_infra::line::{LinePushNotifier, SignatureVerifier};
use courier_infra::llm::gemini::GeminiModel;
use courier_infra::secret::RelaySecrets;
use courier_types::config::RelayConfig;

/// State pinned to the production adapters.
pub type ConcreteState = AppState<GeminiModel, LinePushNotifier>;

/// Shared state handed to every request handler.
pub struct AppState<M: GenerativeModel, N: OutboundNotifier> {
    pub dispatcher: Dispatcher<M, N>,
    pub verifier: Arc<SignatureVerifier>,
    pub redelivery: Arc<RedeliveryGuard>,
    pub started_at: Instant,
}

impl<M: GenerativeModel, N: OutboundNotifier> Clone for AppState<M, N> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            verifier: Arc::clone(&self.verifier),
            redelivery: Arc::clone(&self.redelivery),
            started_at: self.started_at,
        }
    }
}

impl<M, N> AppState<M, N>
where
    M: GenerativeModel + 'static,
    N: OutboundNotifier + 'static,
{
    /// Assemble state around an already-built model and notifier.
    pub fn assemble(config: &RelayConfig, model: M, notifier: N, verifier: SignatureVerifier) -> Self {
        let store = Arc::new(SessionStore::new(RetentionPolicy {
            capacity: config.session_capacity,
            idle_ttl: config.session_idle_ttl(),
        }));
        let client = ConversationClient::new(model, config.request_timeout());
        let dispatcher = Dispatcher::new(
            store,
            client,
            notifier,
            DispatchSettings::from_config(config),
        );

        Self {
            dispatcher,
            verifier: Arc::new(verifier),
            redelivery: Arc::new(RedeliveryGuard::new(config.redelivery_window())),
            started_at: Instant::now(),
        }
    }
}

impl ConcreteState {
    /// Build the production state from configuration and credentials.
    pub fn init(config: &RelayConfig, secrets: RelaySecrets) -> Self {
        let model = GeminiModel::new(secrets.google_api_key, config.model.clone())
            .with_base_url(config.gemini_base_url.clone())
            .with_system_instruction(config.system_instruction.clone());
        let notifier = LinePushNotifier::new(secrets.line_channel_access_token)
            .with_base_url(config.line_api_base_url.clone());
        let verifier = SignatureVerifier::new(secrets.line_channel_secret);

        tracing::info!(
            model = %config.model,
            max_concurrent = config.max_concurrent_exchanges,
            max_pending = config.max_pending_exchanges,
            "relay state initialized"
        );
        Self::assemble(config, model, notifier, verifier)
    }
}
