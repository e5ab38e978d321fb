use common::{
    error::AppError,
    storage::{
        chunk_cache::ChunkCache,
        db::SurrealDbClient,
        types::document::{Document, DocumentSummary, StoredChunk},
    },
    utils::{
        config::ChunkingConfig,
        embedding::{generate_embedding, EmbeddingProvider},
    },
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{chunking::chunk_text, extraction::extract_text};

/// Turns uploaded files into persisted, cache-resident documents.
///
/// Ingestion is extract, chunk, embed, save, publish. The database write is a
/// single document record carrying every chunk, so a failure partway through
/// embedding leaves no partial document behind. The cache entry is published
/// only after the save succeeds.
pub struct IngestionPipeline {
    db: SurrealDbClient,
    cache: Arc<ChunkCache>,
    embedding_provider: EmbeddingProvider,
    chunking: ChunkingConfig,
}

impl IngestionPipeline {
    pub fn new(
        db: SurrealDbClient,
        cache: Arc<ChunkCache>,
        embedding_provider: EmbeddingProvider,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            db,
            cache,
            embedding_provider,
            chunking,
        }
    }

    /// Ingests one uploaded file and returns its listing summary.
    ///
    /// Files that contain no extractable text are rejected with
    /// [`AppError::NoContent`] rather than stored as empty documents.
    #[instrument(skip_all, fields(file_name = %file_name))]
    pub async fn ingest(&self, file_name: &str, bytes: Vec<u8>) -> Result<DocumentSummary, AppError> {
        if file_name.trim().is_empty() {
            return Err(AppError::Validation("File name must not be empty".into()));
        }

        let text = extract_text(bytes, file_name).await?;
        let chunks = chunk_text(&text, &self.chunking)?;
        if chunks.is_empty() {
            return Err(AppError::NoContent(format!(
                "File {file_name} contains no extractable text"
            )));
        }

        // Embeddings are computed sequentially; local embedding servers tend
        // to queue rather than parallelize anyway.
        let mut stored_chunks = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let embedding = generate_embedding(&self.embedding_provider, chunk).await?;
            stored_chunks.push(StoredChunk::new(chunk.clone(), &embedding)?);
        }

        let document = Document::new(file_name.to_string(), stored_chunks);
        document.save(&self.db).await?;

        self.cache
            .put(document.id.clone(), document.cached_chunks()?);

        info!(
            document_id = %document.id,
            chunks = chunks.len(),
            "document ingested"
        );
        Ok(document.summary())
    }

    /// Removes a document from the database and the cache. The record is
    /// deleted first so a crash between the two steps leaves only a stale
    /// cache entry, which the next reload clears.
    #[instrument(skip(self))]
    pub async fn delete(&self, document_id: &str) -> Result<(), AppError> {
        let existed = Document::delete(&self.db, document_id).await?;
        if !existed {
            return Err(AppError::NotFound(format!(
                "Document {document_id} was not found"
            )));
        }

        if !self.cache.remove(document_id) {
            warn!(document_id, "deleted document had no cache entry");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn pipeline() -> (IngestionPipeline, SurrealDbClient, Arc<ChunkCache>) {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let cache = Arc::new(ChunkCache::new());
        let pipeline = IngestionPipeline::new(
            db.clone(),
            Arc::clone(&cache),
            EmbeddingProvider::new_hashed(16),
            ChunkingConfig::default(),
        );
        (pipeline, db, cache)
    }

    #[tokio::test]
    async fn test_ingest_persists_and_publishes_to_cache() {
        let (pipeline, db, cache) = pipeline().await;

        let summary = pipeline
            .ingest("notes.txt", b"The project started in 2019.".to_vec())
            .await
            .expect("Ingestion should succeed");
        assert_eq!(summary.file_name, "notes.txt");

        let stored = Document::get(&db, &summary.id)
            .await
            .expect("Fetch failed")
            .expect("Document should be persisted");
        assert_eq!(stored.chunks.len(), 1);
        assert!(!stored.chunks[0]
            .decode_embedding()
            .expect("decodable")
            .is_empty());

        let cached = cache.get(&summary.id).expect("Cache entry should exist");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].content, "The project started in 2019.");
    }

    #[tokio::test]
    async fn test_long_text_produces_overlapping_chunks() {
        let (pipeline, _db, cache) = pipeline().await;
        let text = "All work and no play makes Jack a dull boy. ".repeat(60);

        let summary = pipeline
            .ingest("novel.txt", text.into_bytes())
            .await
            .expect("Ingestion should succeed");

        let cached = cache.get(&summary.id).expect("Cache entry should exist");
        assert!(cached.len() > 1);
        assert!(cached.iter().all(|c| !c.embedding.is_empty()));
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let (pipeline, db, cache) = pipeline().await;

        let result = pipeline.ingest("empty.txt", b"   \n ".to_vec()).await;
        assert!(matches!(result, Err(AppError::NoContent(_))));

        // Nothing persisted, nothing cached.
        assert!(Document::get_all(&db)
            .await
            .expect("Fetch failed")
            .is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_file_type_is_rejected() {
        let (pipeline, _db, _cache) = pipeline().await;
        let result = pipeline.ingest("image.png", vec![0x89, 0x50]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_cache_entry() {
        let (pipeline, db, cache) = pipeline().await;
        let summary = pipeline
            .ingest("notes.txt", b"some text".to_vec())
            .await
            .expect("Ingestion should succeed");

        pipeline
            .delete(&summary.id)
            .await
            .expect("Delete should succeed");

        assert!(Document::get(&db, &summary.id)
            .await
            .expect("Fetch failed")
            .is_none());
        assert!(cache.get(&summary.id).is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let (pipeline, _db, _cache) = pipeline().await;
        let result = pipeline.delete("no-such-id").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
