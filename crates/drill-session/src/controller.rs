//! Session controller.
//!
//! The controller is the only writer of [`SessionState`]. It funnels every
//! operation through one `tokio::sync::Mutex`, never holds that lock across a
//! provider call, and stamps each provider request with the load generation
//! it was issued under so that late answers for a superseded word are
//! dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::batch::ExampleSlot;
use crate::error::{DrillError, Result};
use crate::provider::ContentProvider;
use crate::scoring::is_perfect;
use crate::session_state::{FeedbackSkip, FeedbackTicket, SessionState, SessionStatus};
use crate::tier::{manual_word, DifficultyTier, WordSelector};
use crate::websocket::{EventBroadcaster, SessionEvent};

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a load request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The batch was applied and the session is ready.
    Loaded {
        /// The word that was loaded.
        word: String,
    },
    /// A newer load started before this one finished; its result was dropped.
    Superseded,
    /// The manual word was blank; nothing happened.
    Ignored,
}

/// Result of a feedback request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// The critique was stored on the slot.
    Received(String),
    /// The provider failed; the slot was left without feedback.
    Failed,
    /// A newer load reset the slot before the answer arrived.
    Discarded,
    /// The request was not made.
    Skipped(FeedbackSkip),
}

// ============================================================================
// Snapshot views
// ============================================================================

/// Read-only view of one slot, with its current score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    /// Position in the batch.
    pub index: usize,
    /// The example, when a batch is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<ExampleSlot>,
    /// What the learner has typed.
    pub practice_text: String,
    /// Reference hidden, practice field shown.
    pub practicing: bool,
    /// Last critique received for this slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// A feedback request is in flight.
    pub feedback_pending: bool,
    /// Accuracy of `practice_text`, when a batch is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// `score == 100`.
    pub perfect: bool,
}

/// Serializable picture of the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Derived session status.
    pub status: SessionStatus,
    /// Current difficulty tier.
    pub difficulty: DifficultyTier,
    /// Word of the last successful load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_word: Option<String>,
    /// Current load generation.
    pub generation: u64,
    /// Whether a content provider is configured.
    pub provider_available: bool,
    /// One view per slot.
    pub slots: Vec<SlotView>,
}

impl SessionSnapshot {
    /// Builds a snapshot from the session state.
    #[must_use]
    pub fn from_state(state: &SessionState, provider_available: bool) -> Self {
        let slots = (0..state.slots.len())
            .filter_map(|index| slot_view(state, index))
            .collect();
        Self {
            status: state.status(),
            difficulty: state.difficulty,
            current_word: state.current_word.clone(),
            generation: state.generation,
            provider_available,
            slots,
        }
    }
}

fn slot_view(state: &SessionState, index: usize) -> Option<SlotView> {
    let slot = state.slots.get(index)?;
    let score = state.accuracy(index);
    Some(SlotView {
        index,
        example: state
            .batch
            .as_ref()
            .and_then(|b| b.slot(index))
            .cloned(),
        practice_text: slot.practice_text.clone(),
        practicing: slot.practicing,
        feedback: slot.feedback.clone(),
        feedback_pending: slot.feedback_pending,
        score,
        perfect: score.is_some_and(is_perfect),
    })
}

// ============================================================================
// SessionController
// ============================================================================

/// Orchestrates word selection, provider calls and session transitions.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    provider: Option<Arc<dyn ContentProvider>>,
    selector: Arc<Mutex<WordSelector>>,
    broadcaster: EventBroadcaster,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("provider_available", &self.provider.is_some())
            .field("broadcaster", &self.broadcaster)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates a controller backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn ContentProvider>, difficulty: DifficultyTier) -> Self {
        Self::build(Some(provider), difficulty)
    }

    /// Creates a controller with no provider.
    ///
    /// Every load is refused with [`DrillError::ProviderUnavailable`] and no
    /// feedback is ever requested.
    #[must_use]
    pub fn unavailable(difficulty: DifficultyTier) -> Self {
        Self::build(None, difficulty)
    }

    fn build(provider: Option<Arc<dyn ContentProvider>>, difficulty: DifficultyTier) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(difficulty))),
            provider,
            selector: Arc::new(Mutex::new(WordSelector::new())),
            broadcaster: EventBroadcaster::default(),
        }
    }

    /// Replaces the word selector.
    #[must_use]
    pub fn with_selector(mut self, selector: WordSelector) -> Self {
        self.selector = Arc::new(Mutex::new(selector));
        self
    }

    /// Replaces the event broadcaster.
    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: EventBroadcaster) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// The broadcaster session events are published on.
    #[must_use]
    pub const fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Returns `true` if a content provider is configured.
    #[must_use]
    pub const fn provider_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Returns a copy of the current session state.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Returns a serializable snapshot of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot::from_state(&state, self.provider_available())
    }

    fn provider(&self) -> Result<&Arc<dyn ContentProvider>> {
        self.provider.as_ref().ok_or_else(|| {
            self.broadcaster.send(SessionEvent::notice(
                "Content provider unavailable; configure credentials and restart",
            ));
            DrillError::ProviderUnavailable
        })
    }

    /// Switches to `tier`, picks a random word from its pool and loads it.
    pub async fn select_word(&self, tier: DifficultyTier) -> Result<LoadOutcome> {
        self.provider()?;
        self.state.lock().await.difficulty = tier;
        let word = self.selector.lock().await.pick(tier);
        info!(tier = %tier, word, "Selected random word");
        self.load_word(word, tier).await
    }

    /// Loads a word typed by the learner at the current difficulty.
    ///
    /// Blank input is ignored.
    pub async fn submit_word(&self, raw: &str) -> Result<LoadOutcome> {
        self.submit_word_at(raw, None).await
    }

    /// Loads a word typed by the learner, switching to `tier` first when
    /// one is given.
    ///
    /// Blank input and a missing provider leave the difficulty untouched.
    pub async fn submit_word_at(
        &self,
        raw: &str,
        tier: Option<DifficultyTier>,
    ) -> Result<LoadOutcome> {
        let Some(word) = manual_word(raw) else {
            debug!("Ignoring blank manual word");
            return Ok(LoadOutcome::Ignored);
        };
        self.provider()?;
        let tier = {
            let mut state = self.state.lock().await;
            if let Some(tier) = tier {
                state.difficulty = tier;
            }
            state.difficulty
        };
        self.load_word(word, tier).await
    }

    /// Fetches and applies a batch for `word`.
    ///
    /// The session enters `Loading` with every slot reset before the provider
    /// is called. A provider failure returns the error after moving back to
    /// `Idle`; a result for a superseded load is dropped.
    pub async fn load_word(&self, word: &str, tier: DifficultyTier) -> Result<LoadOutcome> {
        let provider = Arc::clone(self.provider()?);

        let generation = self.state.lock().await.begin_load();
        info!(word, tier = %tier, generation, "Loading word");
        self.broadcaster
            .send(SessionEvent::load_started(word, tier, generation));

        let result = provider.fetch_batch(word, tier).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(batch) => {
                if !state.apply_batch(generation, batch) {
                    debug!(word, generation, "Discarding batch for superseded load");
                    return Ok(LoadOutcome::Superseded);
                }
                let snapshot = SessionSnapshot::from_state(&state, true);
                drop(state);
                info!(word, generation, "Batch loaded");
                self.broadcaster
                    .send(SessionEvent::batch_loaded(word, tier, snapshot));
                Ok(LoadOutcome::Loaded {
                    word: word.to_string(),
                })
            }
            Err(e) => {
                if !state.fail_load(generation) {
                    debug!(word, generation, error = %e, "Discarding failure for superseded load");
                    return Ok(LoadOutcome::Superseded);
                }
                drop(state);
                warn!(word, generation, kind = %e.kind, "Batch fetch failed");
                self.broadcaster
                    .send(SessionEvent::load_failed(word, e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Flips a slot between showing the reference and the practice field.
    pub async fn toggle_practice(&self, index: usize) -> Result<bool> {
        self.state.lock().await.toggle_practice(index)
    }

    /// Overwrites a slot's practice text and returns the updated view.
    pub async fn set_practice_text(&self, index: usize, text: impl Into<String>) -> Result<SlotView> {
        let mut state = self.state.lock().await;
        state.set_practice_text(index, text)?;
        slot_view(&state, index).ok_or_else(|| DrillError::slot_out_of_range(index, state.slots.len()))
    }

    /// Marks a feedback request as in flight and returns the task that
    /// performs it.
    ///
    /// Returns `Ok(Err(reason))` when the request is a no-op.
    pub async fn start_feedback(
        &self,
        index: usize,
    ) -> Result<std::result::Result<FeedbackTask, FeedbackSkip>> {
        let mut state = self.state.lock().await;
        let Some(provider) = self.provider.clone() else {
            state.slot(index)?;
            return Ok(Err(FeedbackSkip::ProviderUnavailable));
        };
        Ok(state.begin_feedback(index)?.map(|ticket| FeedbackTask {
            controller: self.clone(),
            provider,
            ticket,
        }))
    }

    /// Requests feedback for a slot and waits for it to settle.
    pub async fn request_feedback(&self, index: usize) -> Result<FeedbackOutcome> {
        match self.start_feedback(index).await? {
            Ok(task) => Ok(task.run().await),
            Err(reason) => {
                debug!(index, %reason, "Skipping feedback request");
                Ok(FeedbackOutcome::Skipped(reason))
            }
        }
    }
}

// ============================================================================
// FeedbackTask
// ============================================================================

/// A feedback request whose slot is already marked pending.
///
/// Dropping the task without running it leaves the slot pending until the
/// next load resets it.
pub struct FeedbackTask {
    controller: SessionController,
    provider: Arc<dyn ContentProvider>,
    ticket: FeedbackTicket,
}

impl std::fmt::Debug for FeedbackTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackTask")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}

impl FeedbackTask {
    /// Slot this task belongs to.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.ticket.index
    }

    /// Calls the provider and applies the answer to the slot.
    ///
    /// Provider failures are logged and otherwise swallowed.
    pub async fn run(self) -> FeedbackOutcome {
        let Self {
            controller,
            provider,
            ticket,
        } = self;

        let result = provider
            .fetch_feedback(&ticket.reference, &ticket.learner_text)
            .await;

        let feedback = match result {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(index = ticket.index, kind = %e.kind, error = %e.message, "Feedback fetch failed");
                None
            }
        };

        let applied = controller
            .state
            .lock()
            .await
            .finish_feedback(&ticket, feedback.clone());
        if !applied {
            debug!(index = ticket.index, generation = ticket.generation, "Discarding feedback for superseded load");
            return FeedbackOutcome::Discarded;
        }

        controller
            .broadcaster
            .send(SessionEvent::feedback_settled(ticket.index, feedback.clone()));
        feedback.map_or(FeedbackOutcome::Failed, FeedbackOutcome::Received)
    }
}
