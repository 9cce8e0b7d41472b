//! Conversation endpoints: submit an utterance, read or stream the
//! reconciled transcript, erase an owner's data.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_core::Stream;
use serde::Deserialize;

use sr_domain::{Message, OwnerId};
use sr_safety::{crisis_resources, EMERGENCY_GUIDANCE};

use super::api_error;
use crate::runtime::{EraseError, SubmitError, TranscriptFeed};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/sessions/:owner/messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageQuery {
    /// Wait for the reply (default) or return as soon as the user message
    /// is stored.
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Query(query): Query<PostMessageQuery>,
    Json(body): Json<PostMessageRequest>,
) -> Response {
    let owner = OwnerId::new(owner);

    let handle = match state.orchestrator.submit(&owner, &body.text).await {
        Ok(h) => h,
        Err(e) => return submit_error_response(&e),
    };

    if !query.wait {
        let user_message = handle.user_message().clone();
        // The cycle keeps running on its own task.
        drop(handle);
        return (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "user_message": user_message,
                "state": state.orchestrator.state(&owner),
            })),
        )
            .into_response();
    }

    let Some(outcome) = handle.outcome().await else {
        return api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "cycle_failed",
            "the reply cycle ended without an outcome",
        );
    };

    let mut body = match serde_json::to_value(&outcome) {
        Ok(v) => v,
        Err(e) => {
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization", e.to_string())
        }
    };
    if outcome.crisis.matched {
        body["crisis_resources"] = serde_json::json!({
            "emergency": EMERGENCY_GUIDANCE,
            "resources": crisis_resources(),
        });
    }
    Json(body).into_response()
}

fn submit_error_response(err: &SubmitError) -> Response {
    match err {
        SubmitError::EmptyInput => {
            api_error(StatusCode::BAD_REQUEST, "empty_input", err.to_string())
        }
        SubmitError::SessionBusy => {
            api_error(StatusCode::CONFLICT, "session_busy", err.to_string())
        }
        SubmitError::StoreUnavailable(_) => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", err.to_string())
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/sessions/:owner/transcript
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_transcript(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Response {
    let owner = OwnerId::new(owner);
    match state.orchestrator.transcript(&owner).await {
        Ok(messages) => Json(serde_json::json!({
            "owner": owner,
            "state": state.orchestrator.state(&owner),
            "count": messages.len(),
            "messages": messages,
        }))
        .into_response(),
        Err(e) => api_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/sessions/:owner/stream (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Streams a `transcript` event carrying the full reconciled transcript
/// every time it visibly changes.
pub async fn stream_transcript(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> impl IntoResponse {
    let feed = state.orchestrator.feed(&OwnerId::new(owner));
    Sse::new(make_sse_stream(feed)).keep_alive(KeepAlive::default())
}

fn make_sse_stream(mut feed: TranscriptFeed) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(messages) = feed.changed().await {
            yield Ok(transcript_event(&messages));
        }
        tracing::debug!(owner = %feed.owner(), "transcript stream ended");
    }
}

fn transcript_event(messages: &[Message]) -> Event {
    let data = serde_json::to_string(messages).unwrap_or_else(|_| "[]".into());
    Event::default().event("transcript").data(data)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /api/sessions/:owner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn erase_session(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Response {
    let owner = OwnerId::new(owner);
    match state.orchestrator.erase(&owner).await {
        Ok(removed) => {
            tracing::info!(owner = %owner, removed, "transcript erased");
            Json(serde_json::json!({ "owner": owner, "removed": removed })).into_response()
        }
        Err(e @ EraseError::SessionBusy) => {
            api_error(StatusCode::CONFLICT, "session_busy", e.to_string())
        }
        Err(e @ EraseError::StoreUnavailable(_)) => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string())
        }
    }
}
