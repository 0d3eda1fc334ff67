//! Difficulty tiers, their fixed word pools, and the word selector.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// ============================================================================
// DifficultyTier
// ============================================================================

/// Difficulty tier of a practice word, ordered from easiest to hardest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    /// Tier 1: everyday concrete words.
    #[default]
    Beginner,
    /// Tier 2: common verbs and adjectives.
    Elementary,
    /// Tier 3: general abstract vocabulary.
    Intermediate,
    /// Tier 4: academic and workplace vocabulary.
    UpperIntermediate,
    /// Tier 5: rare, literary and nuanced vocabulary.
    Advanced,
}

impl DifficultyTier {
    /// All tiers in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Beginner,
        Self::Elementary,
        Self::Intermediate,
        Self::UpperIntermediate,
        Self::Advanced,
    ];

    /// Returns the 1-based level of this tier.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Beginner => 1,
            Self::Elementary => 2,
            Self::Intermediate => 3,
            Self::UpperIntermediate => 4,
            Self::Advanced => 5,
        }
    }

    /// Returns the tier for a 1-based level.
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Beginner),
            2 => Some(Self::Elementary),
            3 => Some(Self::Intermediate),
            4 => Some(Self::UpperIntermediate),
            5 => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Short description used when asking the provider for examples.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Beginner => "beginner (short, simple sentences with basic grammar)",
            Self::Elementary => "elementary (simple sentences with common tenses)",
            Self::Intermediate => "intermediate (compound sentences, everyday topics)",
            Self::UpperIntermediate => {
                "upper-intermediate (complex sentences, workplace and academic topics)"
            }
            Self::Advanced => "advanced (nuanced, idiomatic and literary sentences)",
        }
    }

    /// The fixed vocabulary pool for this tier.
    #[must_use]
    pub const fn pool(self) -> &'static [&'static str] {
        match self {
            Self::Beginner => BEGINNER_WORDS,
            Self::Elementary => ELEMENTARY_WORDS,
            Self::Intermediate => INTERMEDIATE_WORDS,
            Self::UpperIntermediate => UPPER_INTERMEDIATE_WORDS,
            Self::Advanced => ADVANCED_WORDS,
        }
    }
}

impl std::fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Elementary => write!(f, "elementary"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::UpperIntermediate => write!(f, "upper_intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Error returned when a tier name or level cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid difficulty tier '{0}': expected 1-5 or one of 'beginner', 'elementary', 'intermediate', 'upper_intermediate', 'advanced'")]
pub struct ParseTierError(String);

impl FromStr for DifficultyTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        if let Ok(level) = normalized.parse::<u8>() {
            return Self::from_level(level).ok_or_else(|| ParseTierError(s.to_string()));
        }
        match normalized.as_str() {
            "beginner" => Ok(Self::Beginner),
            "elementary" => Ok(Self::Elementary),
            "intermediate" => Ok(Self::Intermediate),
            "upper_intermediate" => Ok(Self::UpperIntermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(ParseTierError(s.to_string())),
        }
    }
}

// ============================================================================
// Word pools
// ============================================================================

const BEGINNER_WORDS: &[&str] = &[
    "apple", "house", "water", "friend", "school", "happy", "book", "family", "morning", "dog",
    "eat", "play",
];

const ELEMENTARY_WORDS: &[&str] = &[
    "borrow", "careful", "journey", "remember", "weather", "invite", "expensive", "neighbor",
    "decide", "quiet", "promise", "hungry",
];

const INTERMEDIATE_WORDS: &[&str] = &[
    "achieve", "consider", "opportunity", "reluctant", "influence", "negotiate", "efficient",
    "assume", "obvious", "persuade", "variety", "gradually",
];

const UPPER_INTERMEDIATE_WORDS: &[&str] = &[
    "ambiguous", "comprehensive", "deteriorate", "inevitable", "meticulous", "scrutinize",
    "substantial", "advocate", "coherent", "mitigate", "plausible", "reconcile",
];

const ADVANCED_WORDS: &[&str] = &[
    "ephemeral", "ubiquitous", "obfuscate", "quintessential", "serendipity", "pernicious",
    "magnanimous", "ineffable", "recalcitrant", "perfunctory", "sycophant", "laconic",
];

// ============================================================================
// WordSelector
// ============================================================================

/// Picks practice words uniformly at random from a tier's pool.
#[derive(Debug)]
pub struct WordSelector {
    rng: StdRng,
}

impl Default for WordSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl WordSelector {
    /// Creates a selector seeded from system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a selector with a fixed seed, for reproducible draws.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws one word from the tier's pool.
    pub fn pick(&mut self, tier: DifficultyTier) -> &'static str {
        // Pools are non-empty constants, so `choose` always yields a word.
        tier.pool().choose(&mut self.rng).copied().unwrap_or_default()
    }
}

/// Normalizes a manually entered word.
///
/// Returns `None` for empty or whitespace-only input. Anything else is
/// accepted as-is after trimming, including words outside every pool.
#[must_use]
pub fn manual_word(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
