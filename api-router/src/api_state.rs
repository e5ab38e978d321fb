use std::sync::Arc;

use common::{
    storage::{chunk_cache::ChunkCache, db::SurrealDbClient},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use ingestion_pipeline::IngestionPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub db: SurrealDbClient,
    pub cache: Arc<ChunkCache>,
    pub openai_client: Arc<async_openai::Client<async_openai::config::OpenAIConfig>>,
    pub embedding_provider: Arc<EmbeddingProvider>,
    pub ingestion: Arc<IngestionPipeline>,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(
        db: SurrealDbClient,
        cache: Arc<ChunkCache>,
        openai_client: Arc<async_openai::Client<async_openai::config::OpenAIConfig>>,
        embedding_provider: Arc<EmbeddingProvider>,
        config: AppConfig,
    ) -> Self {
        let ingestion = Arc::new(IngestionPipeline::new(
            db.clone(),
            Arc::clone(&cache),
            embedding_provider.as_ref().clone(),
            config.chunking,
        ));

        Self {
            db,
            cache,
            openai_client,
            embedding_provider,
            ingestion,
            config,
        }
    }
}
