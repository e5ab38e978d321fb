use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient};

use super::{deserialize_datetime, deserialize_flexible_id, serialize_datetime, StoredObject};

/// One bounded span of a document's text, with its embedding persisted in
/// serialized form. The vector is only decoded when an in-memory working copy
/// is needed (cache population, reload).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChunk {
    pub content: String,
    pub embedding_json: String,
}

impl StoredChunk {
    pub fn new(content: String, embedding: &[f32]) -> Result<Self, AppError> {
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|e| AppError::Processing(format!("Failed to serialize embedding: {e}")))?;
        Ok(Self {
            content,
            embedding_json,
        })
    }

    /// Decodes the stored embedding back into its working vector form.
    pub fn decode_embedding(&self) -> Result<Vec<f32>, AppError> {
        serde_json::from_str(&self.embedding_json).map_err(|e| {
            AppError::Processing(format!("Failed to deserialize stored embedding: {e}"))
        })
    }

    pub fn to_cached(&self) -> Result<CachedChunk, AppError> {
        Ok(CachedChunk {
            content: self.content.clone(),
            embedding: self.decode_embedding()?,
        })
    }
}

/// Working form of a chunk as held by the chunk cache: text plus a fully
/// decoded embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedChunk {
    pub content: String,
    pub embedding: Vec<f32>,
}

/// An ingested document. Chunks are embedded in the record so a save commits
/// all of them or none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(
        serialize_with = "serialize_datetime",
        deserialize_with = "deserialize_datetime",
        default
    )]
    pub created_at: DateTime<Utc>,
    #[serde(
        serialize_with = "serialize_datetime",
        deserialize_with = "deserialize_datetime",
        default
    )]
    pub updated_at: DateTime<Utc>,
    pub file_name: String,
    pub chunks: Vec<StoredChunk>,
}

impl StoredObject for Document {
    fn table_name() -> &'static str {
        "document"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}

/// Projection of a document for listings and upload responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(file_name: String, chunks: Vec<StoredChunk>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            file_name,
            chunks,
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            uploaded_at: self.created_at,
        }
    }

    /// Decodes every stored chunk into its working form. Fails if any chunk
    /// carries an unreadable embedding, so callers never end up with a
    /// partially populated entry.
    pub fn cached_chunks(&self) -> Result<Vec<CachedChunk>, AppError> {
        self.chunks.iter().map(StoredChunk::to_cached).collect()
    }

    pub async fn save(&self, db: &SurrealDbClient) -> Result<(), AppError> {
        db.store_item(self.clone()).await?;
        Ok(())
    }

    pub async fn get(db: &SurrealDbClient, id: &str) -> Result<Option<Self>, AppError> {
        Ok(db.get_item::<Self>(id).await?)
    }

    pub async fn get_all(db: &SurrealDbClient) -> Result<Vec<Self>, AppError> {
        Ok(db.get_all_stored_items::<Self>().await?)
    }

    /// Deletes the document record. Returns false when no such document
    /// existed.
    pub async fn delete(db: &SurrealDbClient, id: &str) -> Result<bool, AppError> {
        let deleted = db.delete_item::<Self>(id).await?;
        Ok(deleted.is_some())
    }
}
