//! WebSocket event types and broadcasting for live session observation.
//!
//! Every state change the controller makes is published on an
//! [`EventBroadcaster`]. Connected WebSocket clients and the interactive CLI
//! subscribe to it and re-render from the events.
//!
//! # Event Types
//!
//! - `connected` - Sent when a client connects, includes a session snapshot
//! - `load_started` - A batch fetch was issued
//! - `batch_loaded` - A batch was applied, includes a session snapshot
//! - `load_failed` - The current batch fetch failed
//! - `feedback_settled` - A feedback request finished for one slot
//! - `notice` - Informational message for the learner
//!
//! # Example
//!
//! ```no_run
//! use drill_session::websocket::{EventBroadcaster, SessionEvent};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(SessionEvent::notice("Pick a word to begin"));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {}", event.event_name());
//! }
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::controller::SessionSnapshot;
use crate::tier::DifficultyTier;

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    /// The session as it was when the client connected.
    pub snapshot: SessionSnapshot,
}

/// Payload for the `load_started` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadStartedPayload {
    /// Word being fetched.
    pub word: String,
    /// Tier the batch is requested at.
    pub tier: DifficultyTier,
    /// Generation token of this load.
    pub generation: u64,
    /// When the fetch was issued.
    pub timestamp: DateTime<Utc>,
}

/// Payload for the `batch_loaded` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLoadedPayload {
    /// Word that was loaded.
    pub word: String,
    /// Tier of the batch.
    pub tier: DifficultyTier,
    /// The session right after the batch was applied.
    pub snapshot: SessionSnapshot,
}

/// Payload for the `load_failed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFailedPayload {
    /// Word whose fetch failed.
    pub word: String,
    /// Human-readable error message.
    pub message: String,
}

/// Payload for the `feedback_settled` event.
///
/// `feedback` is absent when the provider call failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSettledPayload {
    /// Slot the feedback belongs to.
    pub index: usize,
    /// The critique, if one was received.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub feedback: Option<String>,
}

/// Payload for the `notice` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticePayload {
    /// Message text.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Session events.
///
/// All events are serialized as JSON objects with "event" and "payload" fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Sent when a client connects.
    Connected(ConnectedPayload),
    /// Sent when a batch fetch is issued.
    LoadStarted(LoadStartedPayload),
    /// Sent when a batch is applied.
    BatchLoaded(BatchLoadedPayload),
    /// Sent when the current batch fetch fails.
    LoadFailed(LoadFailedPayload),
    /// Sent when a feedback request settles.
    FeedbackSettled(FeedbackSettledPayload),
    /// Informational message.
    Notice(NoticePayload),
}

impl SessionEvent {
    /// Creates a `Connected` event.
    #[must_use]
    pub const fn connected(snapshot: SessionSnapshot) -> Self {
        Self::Connected(ConnectedPayload { snapshot })
    }

    /// Creates a `LoadStarted` event stamped with the current time.
    #[must_use]
    pub fn load_started(word: impl Into<String>, tier: DifficultyTier, generation: u64) -> Self {
        Self::LoadStarted(LoadStartedPayload {
            word: word.into(),
            tier,
            generation,
            timestamp: Utc::now(),
        })
    }

    /// Creates a `BatchLoaded` event.
    #[must_use]
    pub fn batch_loaded(
        word: impl Into<String>,
        tier: DifficultyTier,
        snapshot: SessionSnapshot,
    ) -> Self {
        Self::BatchLoaded(BatchLoadedPayload {
            word: word.into(),
            tier,
            snapshot,
        })
    }

    /// Creates a `LoadFailed` event.
    #[must_use]
    pub fn load_failed(word: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed(LoadFailedPayload {
            word: word.into(),
            message: message.into(),
        })
    }

    /// Creates a `FeedbackSettled` event.
    #[must_use]
    pub const fn feedback_settled(index: usize, feedback: Option<String>) -> Self {
        Self::FeedbackSettled(FeedbackSettledPayload { index, feedback })
    }

    /// Creates a `Notice` event.
    #[must_use]
    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice(NoticePayload {
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::LoadStarted(_) => "load_started",
            Self::BatchLoaded(_) => "batch_loaded",
            Self::LoadFailed(_) => "load_failed",
            Self::FeedbackSettled(_) => "feedback_settled",
            Self::Notice(_) => "notice",
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Default per-subscriber buffer size.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Broadcasts session events to every subscriber.
///
/// Events are not persisted for subscribers that join later.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster whose subscribers each buffer up to `capacity`
    /// events before old ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new subscriber.
    ///
    /// A subscriber that falls behind receives a `Lagged` error and misses
    /// some events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event and returns the number of receivers.
    pub fn send(&self, event: SessionEvent) -> usize {
        // Err only means nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::api::AppState;

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum number of missed pong responses before disconnecting.
const MAX_MISSED_PONGS: u8 = 3;

/// WebSocket upgrade handler mounted at `/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("New WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles a single WebSocket connection.
///
/// Sends `connected` with a snapshot, then forwards every broadcast event and
/// pings every 30 seconds. Three unanswered pings close the connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no event falls in between
    let mut event_receiver = state.controller.broadcaster().subscribe();

    let connected_event = SessionEvent::connected(state.controller.snapshot().await);
    let connected_json = match serde_json::to_string(&connected_event) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize connected event: {}", e);
            return;
        }
    };

    if sender.send(Message::Text(connected_json)).await.is_err() {
        debug!("Client disconnected before receiving connected event");
        return;
    }

    info!("WebSocket client connected, sent session snapshot");

    let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
    // The first tick completes immediately
    heartbeat_interval.tick().await;
    let mut missed_pongs = 0u8;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                        debug!("Received pong from client");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client requested close");
                        break;
                    }
                    Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                        // Commands go through the HTTP API
                        debug!("Ignoring data message from client");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            debug!("Failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            event = event_receiver.recv() => {
                match event {
                    Ok(session_event) => {
                        let json = match serde_json::to_string(&session_event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("Failed to send event, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged, missed {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcaster closed");
                        break;
                    }
                }
            }

            _ = heartbeat_interval.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    debug!("Failed to send ping, client disconnected");
                    break;
                }
                missed_pongs += 1;
                if missed_pongs >= MAX_MISSED_PONGS {
                    info!("Client missed {} pongs, closing connection", MAX_MISSED_PONGS);
                    break;
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

// ============================================================================
// Tests
// ============================================================================
