//! Turning raw model output into session types.

use drill_session::{DifficultyTier, ExampleSlot, ProviderError, WordBatch};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Matches a whole reply wrapped in a Markdown code fence, with or without a
/// language tag.
#[allow(clippy::expect_used)]
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?[ \t]*```\s*$")
        .expect("code fence pattern is valid")
});

/// Shape of a batch reply.
#[derive(Debug, Deserialize)]
struct BatchPayload {
    examples: Vec<ExampleSlot>,
}

/// Removes a surrounding Markdown code fence, if present.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    CODE_FENCE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| content.trim(), |m| m.as_str().trim())
}

/// Parses a batch reply for `word` at `tier`.
///
/// Invalid JSON is `Malformed`. Valid JSON with the wrong shape or the wrong
/// number of examples is `Schema`.
pub fn parse_batch(
    content: &str,
    word: &str,
    tier: DifficultyTier,
) -> Result<WordBatch, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ProviderError::malformed(format!("batch reply is not valid JSON: {e}")))?;
    let payload: BatchPayload = serde_json::from_value(value)
        .map_err(|e| ProviderError::schema(format!("batch reply has the wrong shape: {e}")))?;
    WordBatch::new(word, tier, payload.examples)
}

/// Cleans a feedback reply.
pub fn parse_feedback(content: &str) -> Result<String, ProviderError> {
    let text = strip_code_fence(content);
    if text.is_empty() {
        return Err(ProviderError::malformed("feedback reply is empty"));
    }
    Ok(text.to_string())
}
