use std::cmp::Ordering;

use common::{
    storage::types::document::CachedChunk, utils::config::RetrievalConfig,
};

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns exactly `0.0` for mismatched lengths, empty vectors, or a zero
/// norm, never an error. An unembedded or corrupt chunk thereby sorts to the
/// bottom of relevance instead of aborting retrieval.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A chunk scored against one query. `position` is the chunk's place in
/// document order.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub position: usize,
    pub content: String,
    pub score: f32,
}

/// Scores every chunk against the query embedding and keeps the best
/// `top_k` as the candidate pool, ordered by descending similarity. The sort
/// is stable, so equal scores keep document order.
pub fn rank_chunks(
    query_embedding: &[f32],
    chunks: &[CachedChunk],
    config: &RetrievalConfig,
) -> Vec<RankedChunk> {
    let mut ranked: Vec<RankedChunk> = chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| RankedChunk {
            position,
            content: chunk.content.clone(),
            score: cosine_similarity(query_embedding, &chunk.embedding),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(config.top_k);
    ranked
}
