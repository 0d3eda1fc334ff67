//! Sentence Drill session core
//!
//! Word selection, example batches, accuracy scoring, session state and the
//! controller that ties them to a content provider, plus the HTTP API and
//! WebSocket events that expose a session.

pub mod api;
pub mod batch;
pub mod config;
pub mod controller;
pub mod error;
pub mod provider;
pub mod scoring;
pub mod session_state;
pub mod tier;
pub mod websocket;

pub use api::{
    create_router, AppState, ConfigResponse, ErrorResponse, FeedbackResponse, LoadResponse,
    ManualWordRequest, PracticeRequest, RandomWordRequest, TierInfo, ToggleResponse,
};
pub use batch::{ExampleSlot, WordBatch, BATCH_SIZE};
pub use config::{Config, ProviderConfig, CONFIG_FILE_NAME};
pub use controller::{
    FeedbackOutcome, FeedbackTask, LoadOutcome, SessionController, SessionSnapshot, SlotView,
};
pub use error::{DrillError, ProviderError, ProviderErrorKind, Result};
pub use provider::ContentProvider;
pub use scoring::{accuracy, is_perfect, normalize, PERFECT_SCORE};
pub use session_state::{
    FeedbackSkip, FeedbackTicket, SessionState, SessionStatus, SlotPracticeState,
};
pub use tier::{manual_word, DifficultyTier, ParseTierError, WordSelector};
pub use websocket::{EventBroadcaster, SessionEvent};
