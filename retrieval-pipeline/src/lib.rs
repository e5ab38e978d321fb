pub mod answer;
pub mod context;
pub mod scoring;
pub mod validation;

use async_openai::config::OpenAIConfig;
use common::{
    error::AppError,
    storage::{chunk_cache::ChunkCache, db::SurrealDbClient},
    utils::{
        config::RetrievalConfig,
        embedding::{generate_embedding, EmbeddingProvider},
    },
};
use tracing::{debug, info, instrument};

use crate::validation::UNRELATED_ANSWER;

/// Answers one question about one document.
///
/// Embeds the question once, then ranks the document's cached chunks,
/// selects a citation-labeled context window, queries the completion
/// provider, and validates the answer against the citation contract. "No
/// good answer" conditions resolve to fixed refusal strings, never errors;
/// only missing documents, empty documents, and provider/persistence
/// failures surface as `Err`.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(document_id = %document_id, model_id = %model_id))]
pub async fn ask_question(
    db: &SurrealDbClient,
    cache: &ChunkCache,
    openai_client: &async_openai::Client<OpenAIConfig>,
    embedding_provider: &EmbeddingProvider,
    document_id: &str,
    question: &str,
    model_id: &str,
    config: &RetrievalConfig,
) -> Result<String, AppError> {
    if question.trim().is_empty() {
        return Err(AppError::Validation("Question must not be empty".into()));
    }
    if model_id.trim().is_empty() {
        return Err(AppError::Validation("Model id must not be empty".into()));
    }

    let query_embedding = generate_embedding(embedding_provider, question).await?;

    ask_question_with_embedding(
        db,
        cache,
        openai_client,
        query_embedding,
        document_id,
        question,
        model_id,
        config,
    )
    .await
}

/// Same as [`ask_question`] with the query embedding precomputed.
#[allow(clippy::too_many_arguments)]
pub async fn ask_question_with_embedding(
    db: &SurrealDbClient,
    cache: &ChunkCache,
    openai_client: &async_openai::Client<OpenAIConfig>,
    query_embedding: Vec<f32>,
    document_id: &str,
    question: &str,
    model_id: &str,
    config: &RetrievalConfig,
) -> Result<String, AppError> {
    let chunks = match cache.get(document_id) {
        Some(chunks) => chunks,
        None => {
            // One reload, one retry. Concurrent misses coalesce inside the
            // cache, so a burst of questions costs a single rebuild.
            debug!("cache miss, reloading chunk index");
            cache.reload(db).await?;
            cache.get(document_id).ok_or_else(|| {
                AppError::NotFound(format!(
                    "Document {document_id} was not found, even after reloading the cache"
                ))
            })?
        }
    };

    let pool = scoring::rank_chunks(&query_embedding, &chunks, config);
    let Some(best) = pool.first() else {
        return Err(AppError::NoContent(format!(
            "Document {document_id} has no chunks to rank"
        )));
    };
    let top_score = best.score;

    if top_score < config.unrelated_threshold {
        info!(top_score, "question classified as unrelated, skipping model call");
        return Ok(UNRELATED_ANSWER.to_string());
    }

    let selection = context::select_context(pool, config);
    debug!(
        top_score,
        context_chunks = selection.entries.len(),
        "context selection built"
    );

    let request = answer::create_chat_request(model_id, &selection, question)?;
    let response = openai_client.chat().create(request).await?;
    let raw_answer = answer::extract_answer_text(response)?;

    Ok(validation::validate_answer(
        &raw_answer,
        &selection.labels(),
        top_score,
        config,
    ))
}
