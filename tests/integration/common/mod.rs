//! Shared helpers for integration tests.
//!
//! [`ScriptedProvider`] lets a test decide when each provider call returns,
//! so responses can be made to arrive in any order.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drill_session::{
    create_router, AppState, Config, ContentProvider, DifficultyTier, ExampleSlot, ProviderError,
    WordBatch, BATCH_SIZE,
};
use tokio::sync::oneshot;

/// How a gated call should finish.
pub type Release = Result<(), ProviderError>;

/// Provider whose calls can be held open until the test releases them.
///
/// Calls without a registered gate return immediately.
#[derive(Default)]
pub struct ScriptedProvider {
    batch_gates: Mutex<HashMap<String, oneshot::Receiver<Release>>>,
    feedback_gates: Mutex<HashMap<String, oneshot::Receiver<Release>>>,
    batch_calls: AtomicUsize,
    feedback_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Holds the next batch fetch for `word` until the returned sender fires.
    pub fn gate_batch(&self, word: &str) -> oneshot::Sender<Release> {
        let (tx, rx) = oneshot::channel();
        self.batch_gates
            .lock()
            .unwrap()
            .insert(word.to_string(), rx);
        tx
    }

    /// Holds the next feedback fetch for `learner_text`.
    pub fn gate_feedback(&self, learner_text: &str) -> oneshot::Sender<Release> {
        let (tx, rx) = oneshot::channel();
        self.feedback_gates
            .lock()
            .unwrap()
            .insert(learner_text.to_string(), rx);
        tx
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn feedback_calls(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }
}

/// Reference sentence the scripted provider uses for `word` at `index`.
pub fn reference(word: &str, index: usize) -> String {
    format!("The {word} number {index} is here.")
}

/// Feedback text the scripted provider returns for `learner_text`.
pub fn feedback_for(learner_text: &str) -> String {
    format!("Feedback on: {learner_text}")
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    async fn fetch_batch(
        &self,
        word: &str,
        tier: DifficultyTier,
    ) -> Result<WordBatch, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.batch_gates.lock().unwrap().remove(word);
        if let Some(gate) = gate {
            gate.await
                .unwrap_or_else(|_| Err(ProviderError::network("gate dropped")))?;
        }
        let slots = (0..BATCH_SIZE)
            .map(|i| ExampleSlot::new(reference(word, i), "translation", "context", "grammar"))
            .collect();
        WordBatch::new(word, tier, slots)
    }

    async fn fetch_feedback(
        &self,
        _reference: &str,
        learner_text: &str,
    ) -> Result<String, ProviderError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.feedback_gates.lock().unwrap().remove(learner_text);
        if let Some(gate) = gate {
            gate.await
                .unwrap_or_else(|_| Err(ProviderError::network("gate dropped")))?;
        }
        Ok(feedback_for(learner_text))
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Timeout waiting for condition");
}

/// Finds an available port for testing.
pub fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Spawns a server for `state` and returns its base address (`127.0.0.1:port`).
pub async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, handle)
}

/// App state around a controller backed by `provider`.
pub fn app_state(provider: Arc<ScriptedProvider>) -> AppState {
    let controller = drill_session::SessionController::new(provider, DifficultyTier::Beginner);
    AppState::new(Config::default(), controller)
}
