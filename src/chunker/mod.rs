
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sizing policy for chunk splitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum estimated tokens per chunk.
    pub max_chunk_tokens: usize,
    /// Divisor of the character-count token estimate.
    pub chars_per_token: usize,
}

impl Default for ChunkerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_tokens: 500,
            chars_per_token: 4,
        }
    }
}

/// Estimate the token count of a text as `chars / chars_per_token`.
///
/// This is a cheap proxy for a real tokenizer; retrieval quality tolerates
/// the slack, and the ratio is configurable rather than calibrated.
#[inline]
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> usize {
    text.chars().count() / chars_per_token.max(1)
}

/// Split text into chunks that respect the configured maximum size.
///
/// Sentences (split on `". "`) are accumulated until adding the next one
/// would exceed the budget, then the current chunk is flushed. A single
/// sentence that alone exceeds the maximum becomes its own oversized chunk
/// rather than being truncated.
///
/// Every non-final chunk gets its sentence-terminating period restored, so
/// joining the returned chunks with single spaces reproduces the input.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in text.split(". ") {
        let sentence_tokens = estimate_tokens(sentence, config.chars_per_token);

        if current_tokens + sentence_tokens > config.max_chunk_tokens && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        current.push(sentence);
        current_tokens += sentence_tokens;
    }

    if !current.is_empty() {
        groups.push(current);
    }

    let last = groups.len().saturating_sub(1);
    let chunks: Vec<String> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let mut chunk = group.join(". ");
            // Splitting on ". " consumed the period before each flush
            // boundary; restore it on every chunk but the last.
            if i < last {
                chunk.push('.');
            }
            chunk
        })
        .collect();

    debug!(
        "Chunked {} chars into {} chunks (max {} tokens)",
        text.len(),
        chunks.len(),
        config.max_chunk_tokens
    );

    chunks
}
