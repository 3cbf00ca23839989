//! Relay statistics endpoint.
//!
//! GET /api/v1/stats - session and exchange counts.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use courier_core::delivery::OutboundNotifier;
use courier_core::llm::GenerativeModel;

use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RelayStats {
    pub sessions: usize,
    pub session_evictions: u64,
    pub in_flight_tasks: usize,
    pub pending_exchanges: usize,
    pub active_lanes: usize,
    pub remembered_event_ids: usize,
    pub uptime_secs: u64,
}

/// GET /api/v1/stats - Point-in-time counters.
pub async fn get_stats<M, N>(State(state): State<AppState<M, N>>) -> Json<ApiResponse<RelayStats>>
where
    M: GenerativeModel + 'static,
    N: OutboundNotifier + 'static,
{
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let store = state.dispatcher.store();
    let dispatch = state.dispatcher.stats();
    let stats = RelayStats {
        sessions: store.len(),
        session_evictions: store.evictions(),
        in_flight_tasks: dispatch.in_flight_tasks,
        pending_exchanges: dispatch.pending_exchanges,
        active_lanes: dispatch.active_lanes,
        remembered_event_ids: state.redelivery.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    };

    Json(ApiResponse::success(
        stats,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}
