use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub document_id: String,
    pub question: String,
    pub model_id: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Answers one question against one document. Refusals come back as normal
/// 200 answers; only missing documents and malformed requests are errors.
pub async fn ask_question(
    State(state): State<ApiState>,
    Json(input): Json<AskParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        document_id = %input.document_id,
        model_id = %input.model_id,
        question_bytes = input.question.len(),
        "Received chat question"
    );

    let answer = retrieval_pipeline::ask_question(
        &state.db,
        &state.cache,
        &state.openai_client,
        &state.embedding_provider,
        &input.document_id,
        &input.question,
        &input.model_id,
        &state.config.retrieval,
    )
    .await?;

    Ok((StatusCode::OK, Json(AskResponse { answer })))
}

/// Lists the chat models the operator has made available.
pub async fn list_models(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "models": state.config.chat_models })),
    )
}
