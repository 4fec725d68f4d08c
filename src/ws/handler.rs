//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use super::subscription::HandshakeRequest;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError, HandshakeError};

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The handshake is validated before the upgrade, so a malformed request
/// never reaches the registry.
///
/// # Errors
///
/// Returns [`GatewayError::Handshake`] if `pollId` is malformed or the
/// server is shutting down.
#[utoipa::path(
    get,
    path = "/ws",
    tag = "WebSocket",
    summary = "Subscribe to live vote updates",
    description = "Upgrades to a WebSocket. With `pollId` the socket receives that poll's `VOTE_UPDATE` messages; without it, every poll's.",
    params(HandshakeRequest),
    responses(
        (status = 101, description = "Switching protocols"),
        (status = 400, description = "Malformed handshake", body = ErrorResponse),
        (status = 503, description = "Server is shutting down", body = ErrorResponse),
    )
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(request): Query<HandshakeRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let topic = request.topic_key()?;
    if !state.subscriptions.is_accepting() {
        return Err(HandshakeError::ShuttingDown.into());
    }

    let manager = Arc::clone(&state.subscriptions);
    Ok(ws.on_upgrade(move |socket| run_connection(socket, manager, topic)))
}
