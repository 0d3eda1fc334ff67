//! Integration tests for the HTTP API against a live server.

mod common;

use std::time::Duration;

use common::{app_state, feedback_for, spawn_test_server, wait_until, ScriptedProvider};
use drill_session::{
    AppState, Config, DifficultyTier, FeedbackResponse, LoadOutcome, LoadResponse,
    SessionController, SessionSnapshot, SessionStatus, SlotView, ToggleResponse,
};
use serde_json::json;

async fn get_session(client: &reqwest::Client, base: &str) -> SessionSnapshot {
    client
        .get(format!("{base}/api/session"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid session body")
}

/// Tests a full practice round: load, toggle, type, feedback.
#[tokio::test]
async fn test_practice_round_over_http() {
    let provider = ScriptedProvider::new();
    let (addr, _handle) = spawn_test_server(app_state(provider.clone())).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    // Load a word
    let response = client
        .post(format!("{base}/api/word"))
        .json(&json!({ "word": "harbor", "tier": "intermediate" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: LoadResponse = response.json().await.unwrap();
    assert_eq!(
        body.outcome,
        LoadOutcome::Loaded {
            word: "harbor".to_string()
        }
    );
    assert_eq!(body.session.difficulty, DifficultyTier::Intermediate);

    // Hide the reference
    let toggle: ToggleResponse = client
        .post(format!("{base}/api/slots/0/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(toggle.practicing);

    // Type an attempt
    let view: SlotView = client
        .put(format!("{base}/api/slots/0/practice"))
        .json(&json!({ "text": "The harbor is here" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // ref [the, harbor, number, 0, is, here], input [the, harbor, is, here] -> 4/6
    assert_eq!(view.score, Some(67));
    assert!(view.practicing);

    // Ask for feedback; it settles in the background
    let response = client
        .post(format!("{base}/api/slots/0/feedback"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    let body: FeedbackResponse = response.json().await.unwrap();
    assert!(body.pending);

    let mut snapshot = get_session(&client, &base).await;
    for _ in 0..100 {
        if !snapshot.slots[0].feedback_pending {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        snapshot = get_session(&client, &base).await;
    }
    assert_eq!(
        snapshot.slots[0].feedback.as_deref(),
        Some(feedback_for("The harbor is here").as_str())
    );
    assert_eq!(provider.feedback_calls(), 1);
}

/// Tests that a superseded request reports `superseded` to its caller.
#[tokio::test]
async fn test_overlapping_requests_over_http() {
    let provider = ScriptedProvider::new();
    let (addr, _handle) = spawn_test_server(app_state(provider.clone())).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let release_old = provider.gate_batch("anchor");
    let old = tokio::spawn({
        let client = client.clone();
        let base = base.clone();
        async move {
            client
                .post(format!("{base}/api/word"))
                .json(&json!({ "word": "anchor" }))
                .send()
                .await
                .unwrap()
                .json::<LoadResponse>()
                .await
                .unwrap()
        }
    });
    wait_until(|| provider.batch_calls() == 1).await;

    let newer: LoadResponse = client
        .post(format!("{base}/api/word"))
        .json(&json!({ "word": "compass" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        newer.outcome,
        LoadOutcome::Loaded {
            word: "compass".to_string()
        }
    );

    release_old.send(Ok(())).unwrap();
    let old = old.await.unwrap();
    assert_eq!(old.outcome, LoadOutcome::Superseded);
    assert_eq!(old.session.current_word.as_deref(), Some("compass"));
}

/// Tests that a session without a provider refuses loads with 503.
#[tokio::test]
async fn test_unavailable_provider_over_http() {
    let controller = SessionController::unavailable(DifficultyTier::Beginner);
    let (addr, _handle) = spawn_test_server(AppState::new(Config::default(), controller)).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/word/random"))
        .json(&json!({ "tier": "advanced" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);

    let snapshot = get_session(&client, &base).await;
    assert!(!snapshot.provider_available);
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.difficulty, DifficultyTier::Beginner);
}
