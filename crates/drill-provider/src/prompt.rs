//! Prompt text sent to the chat model.

use drill_session::{DifficultyTier, BATCH_SIZE};

/// A system + user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions for the model.
    pub system: String,
    /// The concrete request.
    pub user: String,
}

/// Builds the request for a batch of example sentences.
#[must_use]
pub fn batch_prompt(word: &str, tier: DifficultyTier, native_language: &str) -> Prompt {
    let system = format!(
        "You are a language tutor who writes example sentences for vocabulary practice. \
         Reply with a single JSON object of the form \
         {{\"examples\": [{{\"sentence\": string, \"translation\": string, \"context\": string, \"grammar\": string}}]}} \
         and nothing else. The \"examples\" array must contain exactly {BATCH_SIZE} items."
    );
    let user = format!(
        "Write {BATCH_SIZE} example sentences that use the word \"{word}\".\n\
         Level: {level}.\n\
         For each sentence give its translation into {native_language}, \
         a short note on when it would be used, \
         and the grammar point it illustrates.",
        level = tier.description(),
    );
    Prompt { system, user }
}

/// Builds the request for a critique of the learner's attempt.
#[must_use]
pub fn feedback_prompt(reference: &str, learner_text: &str) -> Prompt {
    let system = "You are a patient language tutor. \
                  Compare the learner's sentence with the reference sentence and \
                  point out the most important mistakes in two or three short sentences. \
                  Reply in plain text."
        .to_string();
    let user = format!("Reference: {reference}\nLearner: {learner_text}");
    Prompt { system, user }
}
