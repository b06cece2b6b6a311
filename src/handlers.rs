// src/handlers.rs
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::identity::CurrentIdentity;
use crate::models::{
    ActionResponse, ListQuery, Poll, PollDetails, PollInput, ShareLinks, VoteRequest, VoteStatus,
};
use crate::poll;
use crate::state::AppState;

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::malformed("body", rejection.body_text()))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/polls
pub async fn list_polls(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Poll>>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::malformed("query", rejection.body_text()))?;

    let identity = if query.mine {
        Some(identity.require()?)
    } else {
        identity.optional()
    };

    let polls = poll::list_polls(&state.store, query.mine, identity.as_ref()).await?;
    Ok(Json(polls))
}

/// POST /api/polls
pub async fn create_poll(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    body: Result<Json<PollInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Poll>), AppError> {
    let identity = identity.require()?;
    let input = payload(body)?;

    let poll = poll::create_poll(&state.store, &input, Some(&identity)).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

/// GET /api/polls/{id}
pub async fn get_poll(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<PollDetails>, AppError> {
    let identity = identity.optional();
    let poll = poll::load_poll(&state.store, poll::parse_poll_id(&id)?).await?;

    let results = poll::results(&state.store, &poll).await?;
    let my_vote = poll::current_vote(&state.store, poll.id, identity.as_ref()).await?;

    Ok(Json(PollDetails {
        poll,
        results,
        my_vote,
    }))
}

/// PUT /api/polls/{id}
pub async fn update_poll(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
    body: Result<Json<PollInput>, JsonRejection>,
) -> Result<Json<Poll>, AppError> {
    let identity = identity.require()?;
    let input = payload(body)?;

    let poll_id = poll::parse_poll_id(&id)?;
    let poll = poll::update_poll(&state.store, poll_id, &input, Some(&identity)).await?;
    Ok(Json(poll))
}

/// DELETE /api/polls/{id}
pub async fn delete_poll(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let identity = identity.require()?;

    let poll_id = poll::parse_poll_id(&id)?;
    poll::delete_poll(&state.store, poll_id, Some(&identity)).await?;
    Ok(Json(ActionResponse::ok("Poll deleted")))
}

/// GET /api/polls/{id}/vote
pub async fn get_vote(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<VoteStatus>, AppError> {
    let identity = identity.optional();
    let poll = poll::load_poll(&state.store, poll::parse_poll_id(&id)?).await?;

    let results = poll::results(&state.store, &poll).await?;
    let my_vote = poll::current_vote(&state.store, poll.id, identity.as_ref()).await?;

    Ok(Json(VoteStatus {
        poll_id: poll.id,
        results,
        has_voted: my_vote.is_some(),
        my_vote,
    }))
}

/// POST /api/polls/{id}/vote
pub async fn submit_vote(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    let identity = identity.require()?;
    let request = payload(body)?;

    let poll_id = poll::parse_poll_id(&id)?;
    poll::submit_vote(
        &state.store,
        poll_id,
        &request.selected_option,
        Some(&identity),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ActionResponse::ok("Vote recorded"))))
}

/// DELETE /api/polls/{id}/vote
pub async fn remove_vote(
    State(state): State<AppState>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let identity = identity.require()?;

    let poll_id = poll::parse_poll_id(&id)?;
    poll::remove_vote(&state.store, poll_id, Some(&identity)).await?;
    Ok(Json(ActionResponse::ok("Vote removed")))
}

/// GET /api/polls/{id}/share
pub async fn share_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShareLinks>, AppError> {
    let poll = poll::load_poll(&state.store, poll::parse_poll_id(&id)?).await?;
    Ok(Json(poll::share_links(&state.config.public_url, poll.id)))
}
