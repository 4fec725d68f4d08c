//! Event ingress for an out-of-process persistence layer.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PublishResponse, VoteCommittedRequest};
use crate::app_state::AppState;
use crate::domain::VoteCommitted;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /events/vote-committed` — Publish the tallies of a committed vote.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `topicKey` is not a valid
/// poll identifier.
#[utoipa::path(
    post,
    path = "/api/v1/events/vote-committed",
    tag = "Events",
    summary = "Notify a committed vote",
    description = "Called by the persistence layer after a vote transaction commits. Broadcasts a `VOTE_UPDATE` to the poll's subscribers and to every general subscriber. Delivery is fire-and-forget.",
    request_body = VoteCommittedRequest,
    responses(
        (status = 202, description = "Update published", body = PublishResponse),
        (status = 400, description = "Invalid topic key", body = ErrorResponse),
    )
)]
pub async fn vote_committed(
    State(state): State<AppState>,
    Json(req): Json<VoteCommittedRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = VoteCommitted::try_from(req)?;
    let poll_id = event.poll_id.clone();
    let report = state.vote_service.vote_committed(event).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse { poll_id, report }),
    ))
}

/// Event routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/vote-committed", post(vote_committed))
}
