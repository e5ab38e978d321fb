use common::{error::AppError, utils::config::ChunkingConfig};
use text_splitter::{ChunkConfig, TextSplitter};

/// Splits extracted document text into overlapping chunks.
///
/// Chunks are capped at `chunk_size` characters with `chunk_overlap`
/// characters repeated between neighbors, so a fact straddling a boundary
/// stays intact in at least one chunk. Trimming is disabled to keep every
/// chunk a verbatim slice of the source text. Blank input yields no chunks.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, AppError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|err| {
            AppError::Validation(format!(
                "Chunk overlap {} is invalid for chunk size {}: {err}",
                config.chunk_overlap, config.chunk_size
            ))
        })?
        .with_trim(false);

    let splitter = TextSplitter::new(chunk_config);
    Ok(splitter.chunks(text).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn test_short_text_is_a_single_chunk() {
        let chunks = chunk_text("a short paragraph", &config(1000, 100)).expect("chunking");
        assert_eq!(chunks, vec!["a short paragraph"]);
    }

    #[test]
    fn test_blank_text_yields_no_chunks() {
        assert!(chunk_text("", &config(1000, 100)).expect("chunking").is_empty());
        assert!(chunk_text("  \n\t ", &config(1000, 100)).expect("chunking").is_empty());
    }

    #[test]
    fn test_chunks_respect_size_cap() {
        let text = "word ".repeat(600);
        let chunks = chunk_text(&text, &config(1000, 100)).expect("chunking");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    }

    #[test]
    fn test_neighboring_chunks_overlap() {
        let text = "word ".repeat(600);
        let chunks = chunk_text(&text, &config(1000, 100)).expect("chunking");

        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(50).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            assert!(
                pair[1].contains(&tail),
                "chunk should repeat the tail of its predecessor"
            );
        }
    }

    #[test]
    fn test_every_character_is_covered() {
        let text = "0123456789".repeat(250);
        let chunks = chunk_text(&text, &config(1000, 100)).expect("chunking");
        let rebuilt_len: usize = chunks.iter().map(String::len).sum();
        // Overlap means total chunk length meets or exceeds the source.
        assert!(rebuilt_len >= text.len());
        assert!(chunks.iter().all(|c| text.contains(c.as_str())));
    }

    #[test]
    fn test_overlap_not_below_chunk_size_is_rejected() {
        let result = chunk_text("some text", &config(100, 100));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
