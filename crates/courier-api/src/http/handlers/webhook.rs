//! LINE webhook receiver.
//!
//! POST /callback - verify, parse, hand text messages to the dispatcher and
//! acknowledge. Never waits on the model or the push API.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use courier_core::delivery::OutboundNotifier;
use courier_core::llm::GenerativeModel;
use courier_infra::line::{self, SIGNATURE_HEADER};
use courier_types::error::DispatchError;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// What happened to the events of one webhook request.
#[derive(Debug, Default, Serialize)]
pub struct CallbackSummary {
    pub events: usize,
    pub dispatched: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// POST /callback - Receive a LINE webhook.
///
/// The signature is checked over the raw body before anything is parsed, so
/// a forged request never reaches the session store. Non-text events are
/// ignored. Dispatch failures are logged only: the dispatcher answers the
/// user itself (busy reply) and LINE must still get a 200.
pub async fn line_callback<M, N>(
    State(state): State<AppState<M, N>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<CallbackSummary>>, AppError>
where
    M: GenerativeModel + 'static,
    N: OutboundNotifier + 'static,
{
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let payload = line::parse_verified(&state.verifier, &body, signature).map_err(|e| {
        warn!(%request_id, error = %e, "rejected webhook request");
        AppError::from(e)
    })?;

    let mut summary = CallbackSummary {
        events: payload.events.len(),
        ..CallbackSummary::default()
    };

    for message in payload.text_messages() {
        if let Some(event_id) = message.event_id {
            if !state.redelivery.first_delivery(event_id) {
                debug!(event_id, user_id = message.user_id, "skipping redelivered event");
                summary.duplicates += 1;
                continue;
            }
        }

        match state.dispatcher.dispatch(message.user_id, message.text) {
            Ok(receipt) => {
                info!(
                    exchange_id = %receipt.exchange_id,
                    user_id = message.user_id,
                    redelivered = message.redelivered,
                    "dispatched message"
                );
                summary.dispatched += 1;
            }
            Err(e) => {
                if already_logged(&e) {
                    debug!(user_id = message.user_id, error = %e, "dispatch rejected");
                } else {
                    warn!(user_id = message.user_id, error = %e, "dispatch rejected");
                }
                summary.rejected += 1;
            }
        }
    }

    Ok(Json(ApiResponse::success(
        summary,
        request_id,
        start.elapsed().as_millis() as u64,
    )))
}

/// The dispatcher warns about saturation itself.
fn already_logged(error: &DispatchError) -> bool {
    matches!(error, DispatchError::Overloaded { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_is_not_logged_twice() {
        assert!(already_logged(&DispatchError::Overloaded { pending: 4 }));
        assert!(!already_logged(&DispatchError::ShuttingDown));
        assert!(!already_logged(&DispatchError::EmptyUserId));
    }
}
