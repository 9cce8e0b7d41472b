pub mod health;
pub mod safety;
pub mod sessions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Liveness
        .route("/api/health", get(health::health))
        // Crisis resource directory (escalation UIs)
        .route("/api/crisis-resources", get(safety::crisis_resources))
        // Conversation
        .route("/api/sessions/:owner", axum::routing::delete(sessions::erase_session))
        .route("/api/sessions/:owner/messages", post(sessions::post_message))
        .route("/api/sessions/:owner/transcript", get(sessions::get_transcript))
        .route("/api/sessions/:owner/stream", get(sessions::stream_transcript))
}

/// Build a standardized JSON error response: `{ "error": "<code>", "message": "<text>" }`.
pub(crate) fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": code, "message": message.into() })),
    )
        .into_response()
}
