//! Session state types for a drill session.
//!
//! [`SessionState`] is the single owner of the current word, its batch and the
//! per-slot practice records. Every transition the controller performs is a
//! method here so that the invariants can be tested without any I/O:
//!
//! - `Idle` -> `Loading` on [`SessionState::begin_load`], which also clears
//!   the batch and resets every slot;
//! - `Loading` -> `Ready` on [`SessionState::apply_batch`];
//! - `Loading` -> `Idle` on [`SessionState::fail_load`].
//!
//! Each load bumps `generation`. Completions carry the generation they were
//! started under and are ignored once a newer load has begun.

use serde::{Deserialize, Serialize};

use crate::batch::{WordBatch, BATCH_SIZE};
use crate::error::{DrillError, Result};
use crate::scoring::{accuracy, is_perfect};
use crate::tier::DifficultyTier;

// ============================================================================
// SessionStatus
// ============================================================================

/// Observable status of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No batch loaded and no load in flight.
    #[default]
    Idle,
    /// A batch fetch is in flight.
    Loading,
    /// A batch is loaded and slots can be practiced.
    Ready,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

// ============================================================================
// SlotPracticeState
// ============================================================================

/// Practice state of one example slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPracticeState {
    /// What the learner has typed so far.
    pub practice_text: String,

    /// `true` while the reference sentence is hidden and the practice field
    /// is shown; `false` while the reference is displayed.
    pub practicing: bool,

    /// Critique returned by the last completed feedback request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    /// `true` while a feedback request for this slot is in flight.
    pub feedback_pending: bool,
}

/// Why a feedback request did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSkip {
    /// No batch is loaded.
    NoBatch,
    /// The slot has no practice text.
    EmptyText,
    /// A request for this slot is already in flight.
    AlreadyPending,
    /// The practice text already matches the reference.
    Perfect,
    /// The session has no content provider.
    ProviderUnavailable,
}

impl std::fmt::Display for FeedbackSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBatch => write!(f, "no batch loaded"),
            Self::EmptyText => write!(f, "practice text is empty"),
            Self::AlreadyPending => write!(f, "feedback already pending"),
            Self::Perfect => write!(f, "answer is already perfect"),
            Self::ProviderUnavailable => write!(f, "provider unavailable"),
        }
    }
}

/// Everything needed to issue and later apply one feedback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTicket {
    /// Slot the request belongs to.
    pub index: usize,
    /// Load generation the request was issued under.
    pub generation: u64,
    /// Reference sentence of the slot.
    pub reference: String,
    /// Learner text at the time of the request.
    pub learner_text: String,
}

// ============================================================================
// SessionState
// ============================================================================

/// Complete in-memory state of a drill session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Tier used for random picks and manual words.
    pub difficulty: DifficultyTier,

    /// Word of the last successfully loaded batch.
    pub current_word: Option<String>,

    /// The loaded batch, absent while idle or loading.
    pub batch: Option<WordBatch>,

    /// One practice record per batch slot; always [`BATCH_SIZE`] long.
    pub slots: Vec<SlotPracticeState>,

    /// `true` while a batch fetch is in flight.
    pub loading: bool,

    /// Incremented on every load; used to discard stale completions.
    pub generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DifficultyTier::default())
    }
}

impl SessionState {
    /// Creates an idle session at the given difficulty.
    ///
    /// # Examples
    ///
    /// ```
    /// use drill_session::{DifficultyTier, SessionState, SessionStatus, BATCH_SIZE};
    ///
    /// let state = SessionState::new(DifficultyTier::Intermediate);
    /// assert_eq!(state.status(), SessionStatus::Idle);
    /// assert_eq!(state.slots.len(), BATCH_SIZE);
    /// assert!(state.current_word.is_none());
    /// ```
    #[must_use]
    pub fn new(difficulty: DifficultyTier) -> Self {
        Self {
            difficulty,
            current_word: None,
            batch: None,
            slots: fresh_slots(),
            loading: false,
            generation: 0,
        }
    }

    /// Derives the observable status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        if self.loading {
            SessionStatus::Loading
        } else if self.batch.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::Idle
        }
    }

    /// Returns `true` if a batch is loaded and no load is in flight.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.status(), SessionStatus::Ready)
    }

    /// Enters `Loading`: clears the batch, resets every slot and returns the
    /// new generation token.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.batch = None;
        self.slots = fresh_slots();
        self.generation
    }

    /// Applies a fetched batch if `generation` is still current.
    ///
    /// Every slot starts fresh with the new batch, including text typed
    /// while the load was in flight. Returns `false` and leaves the state
    /// untouched for a stale generation.
    pub fn apply_batch(&mut self, generation: u64, batch: WordBatch) -> bool {
        if generation != self.generation {
            return false;
        }
        self.current_word = Some(batch.word().to_string());
        self.batch = Some(batch);
        self.slots = fresh_slots();
        self.loading = false;
        true
    }

    /// Ends a failed load if `generation` is still current.
    ///
    /// The batch stays absent and `current_word` keeps its previous value.
    pub fn fail_load(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.loading = false;
        true
    }

    /// Returns the practice record at `index`.
    pub fn slot(&self, index: usize) -> Result<&SlotPracticeState> {
        self.slots
            .get(index)
            .ok_or_else(|| DrillError::slot_out_of_range(index, self.slots.len()))
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut SlotPracticeState> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or_else(|| DrillError::slot_out_of_range(index, len))
    }

    /// Flips between showing the reference and showing the practice field.
    ///
    /// Returns the new `practicing` value.
    pub fn toggle_practice(&mut self, index: usize) -> Result<bool> {
        if !self.is_ready() {
            return Err(DrillError::not_ready(self.status()));
        }
        let slot = self.slot_mut(index)?;
        slot.practicing = !slot.practicing;
        Ok(slot.practicing)
    }

    /// Overwrites the practice text of a slot.
    pub fn set_practice_text(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        self.slot_mut(index)?.practice_text = text.into();
        Ok(())
    }

    /// Scores the slot's practice text against its reference sentence.
    ///
    /// Returns `None` when no batch is loaded or the index is out of range.
    #[must_use]
    pub fn accuracy(&self, index: usize) -> Option<u8> {
        let reference = self.batch.as_ref()?.slot(index)?;
        let slot = self.slots.get(index)?;
        Some(accuracy(&reference.sentence, &slot.practice_text))
    }

    /// Marks a feedback request as in flight and returns its ticket.
    ///
    /// Returns `Ok(Err(reason))` without touching the state when the request
    /// should not be made.
    pub fn begin_feedback(
        &mut self,
        index: usize,
    ) -> Result<std::result::Result<FeedbackTicket, FeedbackSkip>> {
        let generation = self.generation;
        let slot = self.slot(index)?;
        let Some(reference) = self.batch.as_ref().and_then(|b| b.slot(index)) else {
            return Ok(Err(FeedbackSkip::NoBatch));
        };
        if slot.practice_text.trim().is_empty() {
            return Ok(Err(FeedbackSkip::EmptyText));
        }
        if slot.feedback_pending {
            return Ok(Err(FeedbackSkip::AlreadyPending));
        }
        if is_perfect(accuracy(&reference.sentence, &slot.practice_text)) {
            return Ok(Err(FeedbackSkip::Perfect));
        }

        let ticket = FeedbackTicket {
            index,
            generation,
            reference: reference.sentence.clone(),
            learner_text: slot.practice_text.clone(),
        };
        self.slot_mut(index)?.feedback_pending = true;
        Ok(Ok(ticket))
    }

    /// Applies a completed feedback request.
    ///
    /// `feedback` is `None` when the request failed. Returns `false` if the
    /// ticket belongs to an older load, in which case nothing changes.
    pub fn finish_feedback(&mut self, ticket: &FeedbackTicket, feedback: Option<String>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let Some(slot) = self.slots.get_mut(ticket.index) else {
            return false;
        };
        slot.feedback_pending = false;
        if feedback.is_some() {
            slot.feedback = feedback;
        }
        true
    }
}

fn fresh_slots() -> Vec<SlotPracticeState> {
    vec![SlotPracticeState::default(); BATCH_SIZE]
}

// ============================================================================
// Tests
// ============================================================================
