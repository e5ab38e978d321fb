use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::document::{CachedChunk, Document},
    },
};

type Index = HashMap<String, Arc<Vec<CachedChunk>>>;

/// Process-wide index of document id to its fully decoded chunk list.
///
/// The map itself is immutable: readers clone an `Arc` to the current
/// snapshot, writers build a new map and swap it in. An entry is therefore
/// either fully absent or fully populated, never a mix of old and new state.
/// Consistency here is whole-index, which a per-key concurrent map cannot
/// give.
pub struct ChunkCache {
    index: RwLock<Arc<Index>>,
    reload_gate: Mutex<()>,
    generation: AtomicU64,
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkCache {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Arc::new(HashMap::new())),
            reload_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> Arc<Index> {
        Arc::clone(&self.index.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, document_id: &str) -> Option<Arc<Vec<CachedChunk>>> {
        self.snapshot().get(document_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Number of completed full rebuilds. Used by `reload` to coalesce
    /// concurrent callers onto a single in-flight rebuild.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert or replace a single document's entry.
    pub fn put(&self, document_id: String, chunks: Vec<CachedChunk>) {
        let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Index::clone(&guard);
        next.insert(document_id, Arc::new(chunks));
        *guard = Arc::new(next);
    }

    /// Delete a single entry. Returns false when the document was not cached.
    pub fn remove(&self, document_id: &str) -> bool {
        let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.contains_key(document_id) {
            return false;
        }
        let mut next = Index::clone(&guard);
        next.remove(document_id);
        *guard = Arc::new(next);
        true
    }

    /// Atomic wholesale swap of the entire index.
    pub fn replace_all(&self, entries: Index) {
        let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(entries);
    }

    /// Rebuilds the whole index from storage: loads every document, decodes
    /// every stored embedding, and installs the result atomically. On failure
    /// the prior index is left untouched.
    ///
    /// Reloads are single-flight: a full-table scan plus full embedding
    /// decode is too expensive to duplicate under a burst of concurrent cache
    /// misses, so callers that arrive while a rebuild is in flight wait for
    /// it and observe its result instead of starting their own.
    pub async fn reload(&self, db: &SurrealDbClient) -> Result<(), AppError> {
        let observed = self.generation();
        let _gate = self.reload_gate.lock().await;
        if self.generation() != observed {
            debug!("chunk cache reload coalesced with an in-flight rebuild");
            return Ok(());
        }

        let documents = Document::get_all(db).await?;
        let mut next = Index::with_capacity(documents.len());
        for document in documents {
            let chunks = document.cached_chunks()?;
            next.insert(document.id, Arc::new(chunks));
        }

        let count = next.len();
        self.replace_all(next);
        self.generation.fetch_add(1, Ordering::Release);
        info!(documents = count, "chunk cache rebuilt from storage");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::document::StoredChunk;
    use uuid::Uuid;

    fn chunk(content: &str, embedding: Vec<f32>) -> CachedChunk {
        CachedChunk {
            content: content.into(),
            embedding,
        }
    }

    async fn memory_db() -> SurrealDbClient {
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    async fn store_document(db: &SurrealDbClient, file_name: &str, chunks: usize) -> Document {
        let stored: Vec<StoredChunk> = (0..chunks)
            .map(|i| {
                StoredChunk::new(format!("chunk {i} of {file_name}"), &[i as f32, 1.0])
                    .expect("serializable")
            })
            .collect();
        let document = Document::new(file_name.into(), stored);
        document.save(db).await.expect("Failed to save document");
        document
    }

    #[test]
    fn test_put_get_remove() {
        let cache = ChunkCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("missing").is_none());

        cache.put("doc-1".into(), vec![chunk("a", vec![1.0]), chunk("b", vec![0.5])]);
        let entry = cache.get("doc-1").expect("entry should exist");
        assert_eq!(entry.len(), 2);
        assert_eq!(entry[0].content, "a");

        assert!(cache.remove("doc-1"));
        assert!(!cache.remove("doc-1"));
        assert!(cache.get("doc-1").is_none());
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let cache = ChunkCache::new();
        cache.put("doc-1".into(), vec![chunk("original", vec![1.0])]);

        let held = cache.get("doc-1").expect("entry should exist");
        cache.put("doc-1".into(), vec![chunk("replaced", vec![2.0])]);

        // The old snapshot stays fully intact for readers that hold it.
        assert_eq!(held[0].content, "original");
        let fresh = cache.get("doc-1").expect("entry should exist");
        assert_eq!(fresh[0].content, "replaced");
    }

    #[tokio::test]
    async fn test_reload_populates_every_document() {
        let db = memory_db().await;
        let doc_a = store_document(&db, "a.txt", 3).await;
        let doc_b = store_document(&db, "b.txt", 5).await;

        let cache = ChunkCache::new();
        cache.reload(&db).await.expect("Reload failed");

        assert_eq!(cache.len(), 2);
        let entry_a = cache.get(&doc_a.id).expect("doc a should be cached");
        assert_eq!(entry_a.len(), 3);
        let entry_b = cache.get(&doc_b.id).expect("doc b should be cached");
        assert_eq!(entry_b.len(), 5);
        for entry in [entry_a, entry_b] {
            assert!(entry.iter().all(|c| !c.embedding.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_reload_failure_leaves_prior_index() {
        let db = memory_db().await;
        let cache = ChunkCache::new();
        cache.put("stale".into(), vec![chunk("kept", vec![1.0])]);

        let corrupt = Document {
            chunks: vec![StoredChunk {
                content: "bad".into(),
                embedding_json: "not valid json".into(),
            }],
            ..Document::new("bad.txt".into(), Vec::new())
        };
        corrupt.save(&db).await.expect("Failed to save document");

        assert!(cache.reload(&db).await.is_err());
        // Failed rebuild must not have touched the installed index.
        assert!(cache.get("stale").is_some());
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_reloads_coalesce() {
        let db = memory_db().await;
        store_document(&db, "a.txt", 2).await;

        let cache = ChunkCache::new();
        let (first, second) = tokio::join!(cache.reload(&db), cache.reload(&db));
        first.expect("First reload failed");
        second.expect("Second reload failed");

        // Both callers were issued before either rebuild completed, so only
        // one full scan may have run.
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.len(), 1);

        // A later reload is a fresh request and runs on its own.
        cache.reload(&db).await.expect("Third reload failed");
        assert_eq!(cache.generation(), 2);
    }

    #[tokio::test]
    async fn test_remove_after_delete_hides_document() {
        let db = memory_db().await;
        let document = store_document(&db, "a.txt", 2).await;

        let cache = ChunkCache::new();
        cache.reload(&db).await.expect("Reload failed");
        assert!(cache.get(&document.id).is_some());

        Document::delete(&db, &document.id)
            .await
            .expect("Delete failed");
        cache.remove(&document.id);

        assert!(cache.get(&document.id).is_none());
        // A reload confirms absence from storage too.
        cache.reload(&db).await.expect("Reload failed");
        assert!(cache.get(&document.id).is_none());
    }
}
