//! System endpoints: service banner and health check.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{HealthResponse, ServiceInfo};
use crate::app_state::AppState;

/// `GET /` — Service banner listing the public endpoints.
#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    summary = "Service info",
    responses(
        (status = 200, description = "Endpoint listing", body = ServiceInfo),
    )
)]
pub async fn root_handler() -> impl IntoResponse {
    let endpoints: BTreeMap<String, String> = [
        ("health", "/health"),
        ("websocket", "/ws?pollId=<id>"),
        ("vote_committed", "/api/v1/events/vote-committed"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(ServiceInfo {
        message: "Polling update server is running".to_string(),
        endpoints,
    })
}

/// `GET /health` — Service health and live connection counts.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, current timestamp, and the number of registered WebSocket connections per topic.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.subscriptions.stats().await;
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            websocket_connections: stats.topics,
            total_connections: stats.total,
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}
