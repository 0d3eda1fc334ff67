//! HTTP API endpoints for a drill session.
//!
//! The API is a thin layer over [`SessionController`]: every handler calls
//! one controller operation and serializes the result. Live updates are
//! streamed on `/ws`.
//!
//! # Endpoints
//!
//! - `GET /api/session` - Current session snapshot
//! - `GET /api/config` - Default tier, model and the tier list
//! - `POST /api/word/random` - Pick a random word for a tier and load it
//! - `POST /api/word` - Load a word typed by the learner
//! - `POST /api/slots/:index/toggle` - Toggle reference / practice view
//! - `PUT /api/slots/:index/practice` - Replace the practice text
//! - `POST /api/slots/:index/feedback` - Request feedback for a slot
//! - `GET /ws` - WebSocket event stream
//!
//! # Example
//!
//! ```no_run
//! use drill_session::{create_router, AppState, Config, DifficultyTier, SessionController};
//!
//! # async fn example() {
//! let controller = SessionController::unavailable(DifficultyTier::Beginner);
//! let router = create_router(AppState::new(Config::default(), controller));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::controller::{LoadOutcome, SessionController, SessionSnapshot, SlotView};
use crate::error::DrillError;
use crate::session_state::FeedbackSkip;
use crate::tier::DifficultyTier;
use crate::websocket::ws_handler;
use crate::Config;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for `POST /api/word/random`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomWordRequest {
    /// Tier to pick from; the current difficulty when absent.
    #[serde(default)]
    pub tier: Option<DifficultyTier>,
}

/// Request body for `POST /api/word`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualWordRequest {
    /// The word as typed; surrounding whitespace is ignored.
    pub word: String,
    /// Switches the session difficulty before loading when present.
    #[serde(default)]
    pub tier: Option<DifficultyTier>,
}

/// Response body for both word endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    /// What happened to the request.
    #[serde(flatten)]
    pub outcome: LoadOutcome,
    /// The session after the request settled.
    pub session: SessionSnapshot,
}

/// Response body for `POST /api/slots/:index/toggle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    /// The slot that was toggled.
    pub index: usize,
    /// `true` when the practice field is now shown.
    pub practicing: bool,
}

/// Request body for `PUT /api/slots/:index/practice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRequest {
    /// The full practice text.
    pub text: String,
}

/// Response body for `POST /api/slots/:index/feedback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    /// The slot the request was for.
    pub index: usize,
    /// `true` if a provider call was started.
    pub pending: bool,
    /// Why no call was started.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skipped: Option<FeedbackSkip>,
}

/// One entry of the tier list in [`ConfigResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierInfo {
    /// The tier itself.
    pub tier: DifficultyTier,
    /// Level number, 1 to 5.
    pub level: u8,
    /// Human-readable description.
    pub description: String,
}

/// Response body for `GET /api/config`.
///
/// Only settings a front-end needs; credentials never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    /// Tier the session started at.
    pub default_tier: DifficultyTier,
    /// Model that generates the sentences.
    pub model: String,
    /// Language translations are written in.
    pub native_language: String,
    /// Every tier, easiest first.
    pub tiers: Vec<TierInfo>,
}

impl ConfigResponse {
    /// Builds the public view of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_tier: config.default_tier,
            model: config.provider.model.clone(),
            native_language: config.provider.native_language.clone(),
            tiers: DifficultyTier::ALL
                .iter()
                .map(|&tier| TierInfo {
                    tier,
                    level: tier.level(),
                    description: tier.description().to_string(),
                })
                .collect(),
        }
    }
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// The session every handler operates on.
    pub controller: SessionController,
}

impl AppState {
    /// Creates a new `AppState`.
    #[must_use]
    pub const fn new(config: Config, controller: SessionController) -> Self {
        Self { config, controller }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Maps session errors onto HTTP status codes.
#[derive(Debug)]
struct ApiError(DrillError);

impl From<DrillError> for ApiError {
    fn from(err: DrillError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DrillError::SlotOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DrillError::NotReady { .. } => StatusCode::CONFLICT,
            DrillError::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            DrillError::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router.
///
/// All REST routes live under `/api`; the event stream is at `/ws`. CORS is
/// open for local front-ends and every request is traced.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/session", get(handle_session))
        .route("/config", get(handle_config))
        .route("/word/random", post(handle_random_word))
        .route("/word", post(handle_manual_word))
        .route("/slots/:index/toggle", post(handle_toggle))
        .route("/slots/:index/practice", put(handle_practice))
        .route("/slots/:index/feedback", post(handle_feedback));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/session`.
async fn handle_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.controller.snapshot().await)
}

/// Handler for `GET /api/config`.
async fn handle_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse::from_config(&state.config))
}

/// Handler for `POST /api/word/random`.
///
/// Waits for the batch fetch to settle.
async fn handle_random_word(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RandomWordRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let tier = match request.tier {
        Some(tier) => tier,
        None => state.controller.snapshot().await.difficulty,
    };
    info!(tier = %tier, "Random word requested");

    let outcome = state.controller.select_word(tier).await.map_err(|e| {
        warn!(error = %e, "Random word load failed");
        e
    })?;
    Ok(Json(LoadResponse {
        outcome,
        session: state.controller.snapshot().await,
    }))
}

/// Handler for `POST /api/word`.
async fn handle_manual_word(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ManualWordRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    info!(word = %request.word.trim(), "Manual word submitted");

    let outcome = state
        .controller
        .submit_word_at(&request.word, request.tier)
        .await?;
    Ok(Json(LoadResponse {
        outcome,
        session: state.controller.snapshot().await,
    }))
}

/// Handler for `POST /api/slots/:index/toggle`.
async fn handle_toggle(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let practicing = state.controller.toggle_practice(index).await?;
    Ok(Json(ToggleResponse { index, practicing }))
}

/// Handler for `PUT /api/slots/:index/practice`.
async fn handle_practice(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(request): Json<PracticeRequest>,
) -> Result<Json<SlotView>, ApiError> {
    let view = state
        .controller
        .set_practice_text(index, request.text)
        .await?;
    Ok(Json(view))
}

/// Handler for `POST /api/slots/:index/feedback`.
///
/// A started request runs detached; its result arrives as a
/// `feedback_settled` event.
async fn handle_feedback(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<(StatusCode, Json<FeedbackResponse>), ApiError> {
    match state.controller.start_feedback(index).await? {
        Ok(task) => {
            info!(index, "Feedback requested");
            tokio::spawn(task.run());
            Ok((
                StatusCode::ACCEPTED,
                Json(FeedbackResponse {
                    index,
                    pending: true,
                    skipped: None,
                }),
            ))
        }
        Err(reason) => {
            info!(index, %reason, "Feedback request skipped");
            Ok((
                StatusCode::OK,
                Json(FeedbackResponse {
                    index,
                    pending: false,
                    skipped: Some(reason),
                }),
            ))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
