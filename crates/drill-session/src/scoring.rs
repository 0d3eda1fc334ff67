//! Accuracy scoring for practice input.
//!
//! The score is a bag-of-words overlap, not an edit distance: word order is
//! ignored and every learner word present in the reference counts once per
//! occurrence. A score of exactly 100 means the normalized texts are equal,
//! which is what marks a slot as perfect and suppresses feedback requests.

use std::collections::HashSet;

/// Score awarded when the normalized input equals the normalized reference.
pub const PERFECT_SCORE: u8 = 100;

/// Punctuation removed before comparison.
const STRIPPED_PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

/// Lowercases `text`, removes sentence punctuation and trims the result.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Scores `learner_input` against `reference` on a 0–100 scale.
///
/// Rounding is half away from zero on the `f64` ratio, so 1/8 (12.5) scores 13.
#[must_use]
pub fn accuracy(reference: &str, learner_input: &str) -> u8 {
    if learner_input.trim().is_empty() {
        return 0;
    }

    let reference = normalize(reference);
    let input = normalize(learner_input);
    if reference == input {
        return PERFECT_SCORE;
    }

    let reference_words: Vec<&str> = reference.split_whitespace().collect();
    let input_words: Vec<&str> = input.split_whitespace().collect();
    let vocabulary: HashSet<&str> = reference_words.iter().copied().collect();

    let matches = input_words
        .iter()
        .filter(|word| vocabulary.contains(*word))
        .count();
    let denominator = reference_words.len().max(input_words.len());
    if denominator == 0 {
        return 0;
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let score = ((matches as f64 / denominator as f64) * 100.0).round() as u8;
    score
}

/// Returns `true` for a perfect score.
#[must_use]
pub const fn is_perfect(score: u8) -> bool {
    score == PERFECT_SCORE
}
