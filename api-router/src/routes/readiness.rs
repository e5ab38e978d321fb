use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: 200 once the database answers and the chunk cache has
/// completed its warm-up rebuild, 503 otherwise.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    if let Err(e) = state.db.client.query("RETURN true").await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "surrealdb": "fail" },
                "reason": e.to_string()
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "checks": {
                "surrealdb": "ok",
                "chunk_cache": {
                    "documents": state.cache.len(),
                    "generation": state.cache.generation()
                }
            }
        })),
    )
}
