use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use common::storage::types::document::{Document, DocumentSummary};
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "25000000")]
    pub file: FieldData<Bytes>,
}

/// Lists every ingested document, newest first.
pub async fn list_documents(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let mut summaries: Vec<DocumentSummary> = Document::get_all(&state.db)
        .await?
        .iter()
        .map(Document::summary)
        .collect();
    summaries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

    Ok((StatusCode::OK, Json(summaries)))
}

pub async fn upload_document(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("Upload is missing a file name".to_string()))?;

    info!(
        file_name = %file_name,
        bytes = input.file.contents.len(),
        "Received document upload"
    );

    let summary = state
        .ingestion
        .ingest(&file_name, input.file.contents.to_vec())
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn delete_document(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.ingestion.delete(&document_id).await?;
    info!(document_id = %document_id, "Document deleted");

    Ok((StatusCode::OK, Json(json!({ "status": "success" }))))
}
