use axum::response::{IntoResponse, Json};

use sr_safety::{crisis_resources as directory, EMERGENCY_GUIDANCE};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/crisis-resources
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn crisis_resources() -> impl IntoResponse {
    Json(serde_json::json!({
        "emergency": EMERGENCY_GUIDANCE,
        "resources": directory(),
    }))
}
