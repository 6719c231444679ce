// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the conversational turn pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, mock adapters,
//! and every subsystem wired. Tests are independent and order-insensitive.

use std::time::Duration;

use reverie_agent::TurnEvent;
use reverie_core::{DeactivationReason, ReverieError, Role, StorageAdapter};
use reverie_memory::ReanalysisStatus;
use reverie_test_utils::{MockProvider, RecordedRequest, TestHarness};
use tokio::sync::mpsc;

const JOURNAL_REPLY: &str = "Thank you for sharing that with me.";

const BASELINE_MESSAGE: &str = "I care about honesty and my family. I want to finish my degree but I feel anxious. Please just listen.";

const BASELINE_PAYLOAD: &str = r#"{
    "values": [
        {"label": "honesty", "confidence": 0.9, "quote": "I care about honesty"},
        {"label": "family", "confidence": 0.8, "quote": "my family"}
    ],
    "goals": [{"label": "finish degree", "confidence": 0.9, "quote": "I want to finish my degree"}],
    "need_states": [{"label": "esteem", "confidence": 0.6, "quote": "I want to finish my degree"}],
    "emotional_tone": [{"label": "anxious", "confidence": 0.8, "quote": "I feel anxious"}],
    "support_style": [{"label": "validation", "confidence": 0.7, "quote": "Please just listen"}]
}"#;

const NARRATIVE_JSON: &str =
    r#"{"identity_summary": "Someone balancing study and family.", "current_phase": "striving"}"#;

/// Answers extraction with `payload`, narrative synthesis with a fixed
/// narrative and every conversational turn with [`JOURNAL_REPLY`].
fn journaling_provider(payload: &'static str) -> MockProvider {
    MockProvider::with_handler(move |request: &RecordedRequest| {
        let system = request.system.as_deref().unwrap_or_default();
        if system.starts_with("You analyse a single journal message") {
            payload.to_string()
        } else if system.starts_with("You maintain a private") {
            NARRATIVE_JSON.to_string()
        } else {
            JOURNAL_REPLY.to_string()
        }
    })
}

// ---- Blocking turns ----

#[tokio::test]
async fn send_turn_persists_both_messages_and_bumps_conversation() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["It sounds like a full day.".to_string()])
        .without_memory()
        .build()
        .await
        .unwrap();

    let reply = harness.send("Today I walked by the river", None).await.unwrap();
    assert_eq!(reply.response, "It sounds like a full day.");

    let messages = harness
        .storage
        .get_messages(&reply.conversation_id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].id, reply.message_id);

    let prompt = messages[1].prompt.as_deref().unwrap();
    assert!(prompt.starts_with("SYSTEM:\n"));
    assert!(prompt.contains("\n\nUSER:\nToday I walked by the river"));

    let conversation = harness
        .storage
        .get_conversation(&reply.conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert!(conversation.updated_at >= messages[0].created_at);
    assert!(conversation.updated_at >= messages[1].created_at);
}

#[tokio::test]
async fn second_turn_sees_first_turn_in_history() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            "First reply".to_string(),
            "Second reply".to_string(),
        ])
        .without_memory()
        .build()
        .await
        .unwrap();

    let first = harness.send("I slept badly last night", None).await.unwrap();
    let second = harness.send("Still tired this morning", None).await.unwrap();
    assert_eq!(first.conversation_id, second.conversation_id);

    let requests = harness.provider.requests().await;
    assert_eq!(requests.len(), 2);
    let user_prompt = requests[1].last_content();
    assert!(user_prompt.contains("User: I slept badly last night"));
    assert!(user_prompt.contains("Assistant: First reply"));
    assert!(user_prompt.ends_with("Current message:\nStill tired this morning"));
}

#[tokio::test]
async fn first_message_sets_title_once() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let reply = harness.send("Hi", None).await.unwrap();
    let title = reply.title.unwrap();
    assert!(title.starts_with("Conversation - "), "got {title}");

    let again = harness.send("Another thought about today", None).await.unwrap();
    assert!(again.title.is_none());

    let detail = harness
        .orchestrator()
        .get_conversation(&reply.conversation_id)
        .await
        .unwrap();
    assert_eq!(detail.conversation.title.as_deref(), Some(title.as_str()));
}

#[tokio::test]
async fn long_first_message_is_truncated_into_title() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let reply = harness
        .send("My thoughts on personal growth and development", None)
        .await
        .unwrap();
    let title = reply.title.unwrap();
    assert!(title.contains("thoughts"));
    assert!(title.ends_with("..."));
    assert!(title.chars().count() <= 43);
}

#[tokio::test]
async fn empty_input_is_rejected_before_anything_is_stored() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let err = harness.send("   ", None).await.unwrap_err();
    assert!(matches!(err, ReverieError::EmptyInput));
    assert!(harness.storage.list_conversations().await.unwrap().is_empty());
    assert!(harness.provider.requests().await.is_empty());
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let err = harness
        .send("Where did that go?", Some("missing-id"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReverieError::NotFound { .. }));
}

#[tokio::test]
async fn empty_generation_does_not_persist_a_reply() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["   ".to_string()])
        .without_memory()
        .build()
        .await
        .unwrap();

    let err = harness.send("Tell me something", None).await.unwrap_err();
    assert!(matches!(err, ReverieError::EmptyGeneration));

    let conversations = harness.storage.list_conversations().await.unwrap();
    let messages = harness
        .storage
        .get_messages(&conversations[0].id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn provider_failure_surfaces_as_error() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();
    harness.provider.fail_next("backend unreachable").await;

    let err = harness.send("Is anyone there?", None).await.unwrap_err();
    assert!(matches!(err, ReverieError::Provider { .. }));
}

// ---- Streaming turns ----

async fn collect(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn stream_emits_thinking_chunks_then_done() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new().with_thinking())
        .with_mock_responses(vec!["hello there friend".to_string()])
        .without_memory()
        .build()
        .await
        .unwrap();

    let rx = harness
        .orchestrator()
        .stream_turn("Good evening journal", None)
        .await
        .unwrap();
    let events = collect(rx).await;

    assert_eq!(events.first(), Some(&TurnEvent::Thinking));
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::Chunk { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "hello there friend");

    let Some(TurnEvent::Done {
        conversation_id,
        message_id,
        title,
    }) = events.last()
    else {
        panic!("expected Done, got {events:?}");
    };
    assert_eq!(title.as_deref(), Some("Good evening journal"));

    let messages = harness.storage.get_messages(conversation_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(&messages[1].id, message_id);
    assert_eq!(messages[1].content, "hello there friend");
}

#[tokio::test]
async fn stream_of_empty_text_ends_with_error() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![String::new()])
        .without_memory()
        .build()
        .await
        .unwrap();

    let rx = harness
        .orchestrator()
        .stream_turn("Say nothing", None)
        .await
        .unwrap();
    let events = collect(rx).await;

    assert!(matches!(events.last(), Some(TurnEvent::Error { .. })));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::Done { .. })));
}

#[tokio::test]
async fn stream_rejects_empty_input_directly() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let err = harness.orchestrator().stream_turn("", None).await.unwrap_err();
    assert!(matches!(err, ReverieError::EmptyInput));
}

#[tokio::test]
async fn dropped_consumer_abandons_the_turn() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new().with_chunk_delay(Duration::from_millis(50)))
        .with_mock_responses(vec!["one two three four five six".to_string()])
        .build()
        .await
        .unwrap();

    let mut rx = harness
        .orchestrator()
        .stream_turn("Start a long answer", None)
        .await
        .unwrap();
    let first = rx.recv().await.unwrap();
    assert!(matches!(first, TurnEvent::Chunk { .. }));
    drop(rx);

    harness.settle().await;

    let conversations = harness.storage.list_conversations().await.unwrap();
    let messages = harness
        .storage
        .get_messages(&conversations[0].id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
    assert!(harness.storage.get_extractions(&messages[0].id).await.unwrap().is_empty());
}

// ---- Conversation management ----

#[tokio::test]
async fn delete_conversation_cascades() {
    let harness = TestHarness::builder()
        .with_provider(journaling_provider("{}"))
        .build()
        .await
        .unwrap();

    let reply = harness.send("A quiet afternoon", None).await.unwrap();
    harness.settle().await;
    let messages = harness
        .storage
        .get_messages(&reply.conversation_id)
        .await
        .unwrap();
    assert_eq!(harness.storage.get_extractions(&messages[0].id).await.unwrap().len(), 1);

    harness
        .orchestrator()
        .delete_conversation(&reply.conversation_id)
        .await
        .unwrap();

    assert!(harness.storage.list_conversations().await.unwrap().is_empty());
    assert!(harness.storage.get_messages(&reply.conversation_id).await.unwrap().is_empty());
    assert!(harness.storage.get_extractions(&messages[0].id).await.unwrap().is_empty());

    let err = harness
        .orchestrator()
        .delete_conversation(&reply.conversation_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ReverieError::NotFound { .. }));
}

#[tokio::test]
async fn delete_messages_after_truncates_conversation() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let reply = harness.send("The first entry", None).await.unwrap();
    harness.send("The second entry", None).await.unwrap();

    let messages = harness
        .storage
        .get_messages(&reply.conversation_id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 4);

    let removed = harness
        .orchestrator()
        .delete_messages_after(&reply.conversation_id, &messages[0].id)
        .await
        .unwrap();
    assert_eq!(removed, 3);

    let remaining = harness
        .storage
        .get_messages(&reply.conversation_id)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "The first entry");
}

#[tokio::test]
async fn delete_missing_message_is_not_found() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let err = harness
        .orchestrator()
        .delete_message("no-such-message")
        .await
        .unwrap_err();
    assert!(matches!(err, ReverieError::NotFound { .. }));
}

#[tokio::test]
async fn explicit_new_conversation_receives_next_turn() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let first = harness.send("An older entry", None).await.unwrap();
    let fresh = harness.orchestrator().new_conversation().await.unwrap();
    let reply = harness.send("A new page", Some(&fresh.id)).await.unwrap();

    assert_ne!(first.conversation_id, reply.conversation_id);
    assert_eq!(reply.conversation_id, fresh.id);
    assert_eq!(harness.orchestrator().list_conversations().await.unwrap().len(), 2);
}

// ---- Memory, journeys and onboarding ----

#[tokio::test]
async fn journey_onboarding_ends_once_baseline_is_known() {
    let harness = TestHarness::builder()
        .with_provider(journaling_provider(BASELINE_PAYLOAD))
        .with_journey("values", "Guide the user through discovering their values.")
        .build()
        .await
        .unwrap();

    let conversation = harness.orchestrator().start_journey("values").await.unwrap();
    assert_eq!(conversation.title.as_deref(), Some("Journey values"));
    let state = harness
        .orchestrator()
        .onboarding_state(&conversation.id)
        .await
        .unwrap();
    assert!(state.is_active);

    let reply = harness
        .send(BASELINE_MESSAGE, Some(&conversation.id))
        .await
        .unwrap();
    assert_eq!(reply.response, JOURNAL_REPLY);
    assert!(reply.title.is_none());
    harness.settle().await;

    let requests = harness.provider.requests().await;
    let system = requests[0].system.as_deref().unwrap();
    assert!(system.starts_with("Guide the user through discovering their values."));

    let state = harness
        .orchestrator()
        .onboarding_state(&conversation.id)
        .await
        .unwrap();
    assert!(!state.is_active);
    assert_eq!(state.deactivation_reason, Some(DeactivationReason::BaselineMet));

    let view = harness.orchestrator().profile().await.unwrap();
    assert!(view.profile.baseline_complete());
}

#[tokio::test]
async fn unknown_journey_is_not_found() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();

    let err = harness
        .orchestrator()
        .start_journey("missing")
        .await
        .unwrap_err();
    assert!(matches!(err, ReverieError::NotFound { .. }));
}

#[tokio::test]
async fn plain_conversation_never_activates_onboarding() {
    let harness = TestHarness::builder()
        .with_provider(journaling_provider(BASELINE_PAYLOAD))
        .build()
        .await
        .unwrap();

    let reply = harness.send(BASELINE_MESSAGE, None).await.unwrap();
    harness.settle().await;

    let state = harness
        .orchestrator()
        .onboarding_state(&reply.conversation_id)
        .await
        .unwrap();
    assert!(!state.is_active);
    assert!(state.deactivation_reason.is_none());
}

#[tokio::test]
async fn earlier_entries_are_retrieved_into_later_prompts() {
    let harness = TestHarness::builder()
        .with_provider(journaling_provider("{}"))
        .build()
        .await
        .unwrap();

    harness
        .send("Running along the harbour clears my head", None)
        .await
        .unwrap();
    harness.settle().await;

    let fresh = harness.orchestrator().new_conversation().await.unwrap();
    harness
        .send("Running along the harbour clears my head", Some(&fresh.id))
        .await
        .unwrap();

    let requests = harness.provider.requests().await;
    let turn = requests
        .iter()
        .rev()
        .find(|r| r.last_content() == "Running along the harbour clears my head")
        .unwrap();
    let system = turn.system.as_deref().unwrap();
    assert!(system.contains("## Related past entries\n- Running along the harbour clears my head"));
}

#[tokio::test]
async fn reanalysis_reports_progress_for_every_user_message() {
    let harness = TestHarness::builder()
        .with_provider(journaling_provider("{}"))
        .build()
        .await
        .unwrap();

    let reply = harness.send("Morning pages, day one", None).await.unwrap();
    harness.send("Morning pages, day two", None).await.unwrap();
    harness.send("Morning pages, day three", None).await.unwrap();
    harness.settle().await;

    let (tx, mut rx) = mpsc::channel(16);
    let report = harness
        .orchestrator()
        .reanalyze_conversation(&reply.conversation_id, &tx)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.total, 3);
    assert_eq!(report.validated, 3);

    let mut progress = Vec::new();
    while let Some(p) = rx.recv().await {
        progress.push(p);
    }
    let currents: Vec<usize> = progress.iter().map(|p| p.current).collect();
    assert_eq!(currents, vec![1, 2, 3]);
    assert!(progress.iter().all(|p| p.total == 3));
    assert_eq!(progress[2].status, ReanalysisStatus::Completed);
    assert_eq!(progress[0].status, ReanalysisStatus::Running);

    let messages = harness
        .storage
        .get_messages(&reply.conversation_id)
        .await
        .unwrap();
    assert_eq!(harness.storage.get_extractions(&messages[0].id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reanalysis_requires_memory() {
    let harness = TestHarness::builder().without_memory().build().await.unwrap();
    let reply = harness.send("Something to analyse", None).await.unwrap();

    let (tx, _rx) = mpsc::channel(4);
    let err = harness
        .orchestrator()
        .reanalyze_conversation(&reply.conversation_id, &tx)
        .await
        .unwrap_err();
    assert!(err.is_config());
}
