//! Axum router configuration with middleware.
//!
//! `/callback` is the LINE webhook URL. JSON endpoints live under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use courier_core::delivery::OutboundNotifier;
use courier_core::llm::GenerativeModel;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router<M, N>(state: AppState<M, N>) -> Router
where
    M: GenerativeModel + 'static,
    N: OutboundNotifier + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new().route("/stats", get(handlers::stats::get_stats::<M, N>));

    Router::new()
        .route("/callback", post(handlers::webhook::line_callback::<M, N>))
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness check.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
