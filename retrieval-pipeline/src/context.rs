use std::collections::HashSet;
use std::fmt::Write;

use common::utils::config::RetrievalConfig;

use crate::scoring::RankedChunk;

/// One selected chunk with its query-scoped citation label (`C1`, `C2`, ...).
/// Labels are assigned in rank order and are not stable across queries.
#[derive(Debug, Clone)]
pub struct CitedChunk {
    pub label: String,
    pub chunk: RankedChunk,
}

/// The bounded, relevance-ordered set of chunks supplied to the model for
/// one question.
#[derive(Debug, Clone)]
pub struct ContextSelection {
    pub entries: Vec<CitedChunk>,
}

impl ContextSelection {
    pub fn labels(&self) -> HashSet<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    /// Renders the labeled, score-annotated context blocks in label order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str("\n---\n");
            }
            let _ = write!(
                out,
                "[{}] (score {:.3})\n{}",
                entry.label, entry.chunk.score, entry.chunk.content
            );
        }
        out
    }
}

/// Narrows a ranked candidate pool to the final context selection.
///
/// Candidates must clear `max(score_floor, top_score - band_margin)` and at
/// most `max_context` survive. The band keeps the context from collapsing to
/// the single best chunk while still excluding marginally relevant material.
/// An empty result falls back to the single best candidate; callers have
/// already rejected empty pools and unrelated queries by this point.
pub fn select_context(pool: Vec<RankedChunk>, config: &RetrievalConfig) -> ContextSelection {
    let top_score = pool.first().map_or(0.0, |c| c.score);
    let cutoff = config.score_floor.max(top_score - config.band_margin);

    // The pool arrives sorted descending; filtering preserves that order.
    let mut kept: Vec<RankedChunk> = pool
        .iter()
        .filter(|candidate| candidate.score >= cutoff)
        .cloned()
        .collect();
    kept.truncate(config.max_context);

    if kept.is_empty() {
        if let Some(best) = pool.into_iter().next() {
            kept.push(best);
        }
    }

    let entries = kept
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| CitedChunk {
            label: format!("C{}", i + 1),
            chunk,
        })
        .collect();

    ContextSelection { entries }
}
