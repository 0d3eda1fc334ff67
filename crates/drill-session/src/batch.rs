//! Example batches produced by the content provider.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::tier::DifficultyTier;

/// Number of example sentences in every batch.
pub const BATCH_SIZE: usize = 10;

/// One example sentence for the practice word, with its study notes.
///
/// All four fields are required; empty strings are valid content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSlot {
    /// The reference sentence the learner reproduces.
    pub sentence: String,
    /// Translation into the learner's native language.
    pub translation: String,
    /// When and where the sentence would be used.
    pub context: String,
    /// Grammar point illustrated by the sentence.
    pub grammar: String,
}

impl ExampleSlot {
    /// Creates an example slot.
    #[must_use]
    pub fn new(
        sentence: impl Into<String>,
        translation: impl Into<String>,
        context: impl Into<String>,
        grammar: impl Into<String>,
    ) -> Self {
        Self {
            sentence: sentence.into(),
            translation: translation.into(),
            context: context.into(),
            grammar: grammar.into(),
        }
    }
}

/// A complete batch of examples for one word.
///
/// A batch always holds exactly [`BATCH_SIZE`] slots; a short or long
/// response is rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordBatch {
    word: String,
    tier: DifficultyTier,
    slots: Vec<ExampleSlot>,
}

impl WordBatch {
    /// Validates the slot count and builds a batch.
    ///
    /// # Errors
    ///
    /// Returns a `Schema` provider error when `slots` does not hold exactly
    /// [`BATCH_SIZE`] entries.
    pub fn new(
        word: impl Into<String>,
        tier: DifficultyTier,
        slots: Vec<ExampleSlot>,
    ) -> Result<Self, ProviderError> {
        if slots.len() != BATCH_SIZE {
            return Err(ProviderError::schema(format!(
                "expected {BATCH_SIZE} examples, got {}",
                slots.len()
            )));
        }
        Ok(Self {
            word: word.into(),
            tier,
            slots,
        })
    }

    /// The word this batch illustrates.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// The tier the batch was requested for.
    #[must_use]
    pub const fn tier(&self) -> DifficultyTier {
        self.tier
    }

    /// All example slots, in provider order.
    #[must_use]
    pub fn slots(&self) -> &[ExampleSlot] {
        &self.slots
    }

    /// The slot at `index`, if any.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&ExampleSlot> {
        self.slots.get(index)
    }
}
