//! Content provider gateway.
//!
//! The session core only sees this trait. Production code plugs in an HTTP
//! client; tests plug in scripted fakes.

use async_trait::async_trait;

use crate::batch::WordBatch;
use crate::error::ProviderError;
use crate::tier::DifficultyTier;

/// Source of example batches and practice feedback.
///
/// Calls have no guaranteed response time. Implementations must not retry on
/// their own; every retry is an explicit new user action.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetches a full batch of examples for `word` at `tier`.
    ///
    /// On success the batch holds exactly [`crate::BATCH_SIZE`] slots.
    async fn fetch_batch(
        &self,
        word: &str,
        tier: DifficultyTier,
    ) -> Result<WordBatch, ProviderError>;

    /// Asks for a short critique of `learner_text` against `reference`.
    ///
    /// Callers never pass an empty `learner_text`.
    async fn fetch_feedback(
        &self,
        reference: &str,
        learner_text: &str,
    ) -> Result<String, ProviderError>;
}
