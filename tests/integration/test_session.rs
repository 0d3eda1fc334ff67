//! Integration tests for session ordering guarantees.
//!
//! Provider responses are released by hand so each test can choose the
//! order in which overlapping requests settle.

mod common;

use std::sync::Arc;

use common::{feedback_for, reference, wait_until, ScriptedProvider};
use drill_session::{
    DifficultyTier, DrillError, FeedbackOutcome, FeedbackSkip, LoadOutcome, ProviderError,
    SessionController, SessionStatus,
};

fn controller(provider: &Arc<ScriptedProvider>) -> SessionController {
    SessionController::new(Arc::clone(provider) as _, DifficultyTier::Beginner)
}

fn spawn_load(
    controller: &SessionController,
    word: &'static str,
) -> tokio::task::JoinHandle<drill_session::Result<LoadOutcome>> {
    let controller = controller.clone();
    tokio::spawn(async move { controller.submit_word(word).await })
}

// ============================================================================
// Overlapping loads
// ============================================================================

/// The newer word wins when the older response arrives last.
#[tokio::test]
async fn test_newer_load_wins_when_older_arrives_last() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    let release_apple = provider.gate_batch("apple");
    let release_pear = provider.gate_batch("pear");

    let apple = spawn_load(&controller, "apple");
    wait_until(|| provider.batch_calls() == 1).await;
    let pear = spawn_load(&controller, "pear");
    wait_until(|| provider.batch_calls() == 2).await;

    release_pear.send(Ok(())).unwrap();
    assert_eq!(
        pear.await.unwrap().unwrap(),
        LoadOutcome::Loaded {
            word: "pear".to_string()
        }
    );

    release_apple.send(Ok(())).unwrap();
    assert_eq!(apple.await.unwrap().unwrap(), LoadOutcome::Superseded);

    let state = controller.state().await;
    assert_eq!(state.status(), SessionStatus::Ready);
    assert_eq!(state.current_word.as_deref(), Some("pear"));
    assert_eq!(
        state.batch.unwrap().slot(0).unwrap().sentence,
        reference("pear", 0)
    );
}

/// The older response is dropped even when it arrives first.
#[tokio::test]
async fn test_newer_load_wins_when_older_arrives_first() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    let release_apple = provider.gate_batch("apple");
    let release_pear = provider.gate_batch("pear");

    let apple = spawn_load(&controller, "apple");
    wait_until(|| provider.batch_calls() == 1).await;
    let pear = spawn_load(&controller, "pear");
    wait_until(|| provider.batch_calls() == 2).await;

    release_apple.send(Ok(())).unwrap();
    assert_eq!(apple.await.unwrap().unwrap(), LoadOutcome::Superseded);

    // Still waiting on the newer request
    let state = controller.state().await;
    assert_eq!(state.status(), SessionStatus::Loading);
    assert!(state.current_word.is_none());

    release_pear.send(Ok(())).unwrap();
    pear.await.unwrap().unwrap();

    let state = controller.state().await;
    assert_eq!(state.current_word.as_deref(), Some("pear"));
    assert_eq!(state.generation, 2);
}

/// A failure for a superseded load does not end the newer load.
#[tokio::test]
async fn test_stale_failure_is_ignored() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    let release_apple = provider.gate_batch("apple");
    let release_pear = provider.gate_batch("pear");

    let apple = spawn_load(&controller, "apple");
    wait_until(|| provider.batch_calls() == 1).await;
    let pear = spawn_load(&controller, "pear");
    wait_until(|| provider.batch_calls() == 2).await;

    release_apple
        .send(Err(ProviderError::network("connection reset")))
        .unwrap();
    assert_eq!(apple.await.unwrap().unwrap(), LoadOutcome::Superseded);
    assert_eq!(controller.state().await.status(), SessionStatus::Loading);

    release_pear.send(Ok(())).unwrap();
    pear.await.unwrap().unwrap();
    assert_eq!(controller.state().await.status(), SessionStatus::Ready);
}

/// A failed load keeps the previous word but not its batch.
#[tokio::test]
async fn test_failed_load_keeps_current_word() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    controller.submit_word("apple").await.unwrap();
    controller.set_practice_text(0, "typed").await.unwrap();

    let release = provider.gate_batch("pear");
    release
        .send(Err(ProviderError::malformed("not json")))
        .unwrap();
    let err = controller.submit_word("pear").await.unwrap_err();

    assert!(matches!(err, DrillError::Provider(_)));
    let state = controller.state().await;
    assert_eq!(state.status(), SessionStatus::Idle);
    assert_eq!(state.current_word.as_deref(), Some("apple"));
    assert!(state.batch.is_none());
    assert!(state.slots.iter().all(|s| s.practice_text.is_empty()));
}

/// A failed load from idle leaves the session exactly as it was.
#[tokio::test]
async fn test_failed_load_from_idle_is_unchanged() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    let before = controller.snapshot().await;

    provider
        .gate_batch("apple")
        .send(Err(ProviderError::network("offline")))
        .unwrap();
    controller.submit_word("apple").await.unwrap_err();

    let after = controller.snapshot().await;
    assert_eq!(after.status, before.status);
    assert_eq!(after.current_word, before.current_word);
    assert_eq!(after.slots, before.slots);
    // Only the generation counter moves
    assert_eq!(after.generation, before.generation + 1);
}

/// Text typed while a load is in flight does not carry into the new batch.
#[tokio::test]
async fn test_text_typed_while_loading_is_reset_on_accept() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    let release = provider.gate_batch("apple");

    let apple = spawn_load(&controller, "apple");
    wait_until(|| provider.batch_calls() == 1).await;
    controller
        .set_practice_text(0, "typed while loading")
        .await
        .unwrap();
    assert_eq!(controller.state().await.status(), SessionStatus::Loading);

    release.send(Ok(())).unwrap();
    apple.await.unwrap().unwrap();

    let snapshot = controller.snapshot().await;
    assert!(snapshot.slots[0].practice_text.is_empty());
    assert_eq!(snapshot.slots[0].score, Some(0));
    assert_eq!(
        controller.request_feedback(0).await.unwrap(),
        FeedbackOutcome::Skipped(FeedbackSkip::EmptyText)
    );
    assert_eq!(provider.feedback_calls(), 0);
}

/// A superseded batch arriving late leaves the current slots alone.
#[tokio::test]
async fn test_superseded_batch_keeps_current_slots() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    let release_apple = provider.gate_batch("apple");

    let apple = spawn_load(&controller, "apple");
    wait_until(|| provider.batch_calls() == 1).await;
    controller.submit_word("pear").await.unwrap();
    controller.set_practice_text(4, "the pear").await.unwrap();

    release_apple.send(Ok(())).unwrap();
    assert_eq!(apple.await.unwrap().unwrap(), LoadOutcome::Superseded);

    let state = controller.state().await;
    assert_eq!(state.current_word.as_deref(), Some("pear"));
    assert_eq!(state.slots[4].practice_text, "the pear");
}

// ============================================================================
// Feedback
// ============================================================================

/// Feedback for a slot that was reset by a newer load is discarded.
#[tokio::test]
async fn test_feedback_after_new_load_is_discarded() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    controller.submit_word("apple").await.unwrap();
    controller.set_practice_text(0, "the apple").await.unwrap();

    let release = provider.gate_feedback("the apple");
    let task = controller.start_feedback(0).await.unwrap().unwrap();
    let feedback = tokio::spawn(task.run());
    wait_until(|| provider.feedback_calls() == 1).await;

    controller.submit_word("pear").await.unwrap();
    release.send(Ok(())).unwrap();

    assert_eq!(feedback.await.unwrap(), FeedbackOutcome::Discarded);
    let state = controller.state().await;
    assert!(state.slots[0].feedback.is_none());
    assert!(!state.slots[0].feedback_pending);
    assert_eq!(state.current_word.as_deref(), Some("pear"));
}

/// Slots request feedback independently and may settle in any order.
#[tokio::test]
async fn test_feedback_runs_concurrently_across_slots() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    controller.submit_word("apple").await.unwrap();
    controller.set_practice_text(1, "first try").await.unwrap();
    controller.set_practice_text(2, "second try").await.unwrap();

    let release_first = provider.gate_feedback("first try");
    let release_second = provider.gate_feedback("second try");
    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_feedback(1).await }
    });
    let second = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_feedback(2).await }
    });
    wait_until(|| provider.feedback_calls() == 2).await;

    release_second.send(Ok(())).unwrap();
    assert_eq!(
        second.await.unwrap().unwrap(),
        FeedbackOutcome::Received(feedback_for("second try"))
    );
    assert!(controller.state().await.slots[1].feedback_pending);

    release_first.send(Ok(())).unwrap();
    assert_eq!(
        first.await.unwrap().unwrap(),
        FeedbackOutcome::Received(feedback_for("first try"))
    );

    let state = controller.state().await;
    assert_eq!(
        state.slots[1].feedback.as_deref(),
        Some(feedback_for("first try").as_str())
    );
    assert_eq!(
        state.slots[2].feedback.as_deref(),
        Some(feedback_for("second try").as_str())
    );
}

/// A second request for a slot with one in flight is a no-op.
#[tokio::test]
async fn test_one_feedback_request_per_slot() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    controller.submit_word("apple").await.unwrap();
    controller.set_practice_text(3, "apple").await.unwrap();

    let release = provider.gate_feedback("apple");
    let task = controller.start_feedback(3).await.unwrap().unwrap();
    let running = tokio::spawn(task.run());
    wait_until(|| provider.feedback_calls() == 1).await;

    assert_eq!(
        controller.request_feedback(3).await.unwrap(),
        FeedbackOutcome::Skipped(FeedbackSkip::AlreadyPending)
    );
    assert_eq!(provider.feedback_calls(), 1);

    release.send(Ok(())).unwrap();
    assert!(matches!(
        running.await.unwrap(),
        FeedbackOutcome::Received(_)
    ));
}

/// A failed feedback call clears the pending flag and nothing else.
#[tokio::test]
async fn test_feedback_failure_is_silent() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    controller.submit_word("apple").await.unwrap();
    controller.set_practice_text(0, "apple").await.unwrap();

    provider
        .gate_feedback("apple")
        .send(Err(ProviderError::network("offline")))
        .unwrap();

    assert_eq!(
        controller.request_feedback(0).await.unwrap(),
        FeedbackOutcome::Failed
    );
    let state = controller.state().await;
    assert!(!state.slots[0].feedback_pending);
    assert!(state.slots[0].feedback.is_none());

    // A later request for the same text is allowed
    assert_eq!(
        controller.request_feedback(0).await.unwrap(),
        FeedbackOutcome::Received(feedback_for("apple"))
    );
}

/// Perfect answers never reach the provider.
#[tokio::test]
async fn test_perfect_answer_skips_provider() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);
    controller.submit_word("apple").await.unwrap();

    let view = controller
        .set_practice_text(0, "the APPLE number 0 is here")
        .await
        .unwrap();
    assert!(view.perfect);

    assert_eq!(
        controller.request_feedback(0).await.unwrap(),
        FeedbackOutcome::Skipped(FeedbackSkip::Perfect)
    );
    assert_eq!(provider.feedback_calls(), 0);
}

// ============================================================================
// Word selection
// ============================================================================

/// A random pick always comes from the chosen tier.
#[tokio::test]
async fn test_random_word_comes_from_tier_pool() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);

    for tier in DifficultyTier::ALL {
        let LoadOutcome::Loaded { word } = controller.select_word(tier).await.unwrap() else {
            panic!("expected a loaded batch");
        };
        assert!(tier.pool().contains(&word.as_str()));
        assert_eq!(controller.state().await.difficulty, tier);
    }
}

/// Blank manual words never reach the provider.
#[tokio::test]
async fn test_blank_manual_word_is_ignored() {
    let provider = ScriptedProvider::new();
    let controller = controller(&provider);

    assert_eq!(
        controller.submit_word(" \t ").await.unwrap(),
        LoadOutcome::Ignored
    );
    assert_eq!(provider.batch_calls(), 0);
}
