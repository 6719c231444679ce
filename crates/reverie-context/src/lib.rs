// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembler for Reverie prompt construction.
//!
//! Produces the (system, user) prompt pair for one turn from:
//! - **Persona or journey prompt**: a known journey replaces the standard prompt
//! - **Profile**: evidence-derived summary plus the current narrative
//! - **Retrieval**: semantically similar past entries and insights
//! - **Style**: support-seeking style and current intent (standard prompt only)
//! - **History**: a bounded window of recent messages in the user prompt

pub mod history;
pub mod persona;
pub mod retrieval;
pub mod style;

use std::collections::HashSet;
use std::sync::Arc;

use reverie_config::model::{AgentConfig, ContextConfig};
use reverie_core::{
    Conversation, EmbeddingAdapter, JourneyRegistry, Message, ReverieError, SimilarityIndex,
    StorageAdapter,
};
use reverie_memory::Profile;
use tracing::debug;

pub use persona::{NO_PROFILE_PLACEHOLDER, Persona};
pub use retrieval::{Retrieved, Retriever};
pub use style::ADAPTIVE_DIRECTIVE;

/// The prompt pair handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

impl AssembledPrompt {
    /// The exact text sent to the provider, as stored with the reply.
    pub fn transcript(&self) -> String {
        format!("SYSTEM:\n{}\n\nUSER:\n{}", self.system, self.user)
    }
}

/// Assembles prompts from storage, the similarity index and the journey registry.
pub struct ContextAssembler {
    persona: Persona,
    history_window: usize,
    storage: Arc<dyn StorageAdapter>,
    journeys: Arc<dyn JourneyRegistry>,
    retriever: Retriever,
}

impl ContextAssembler {
    pub fn new(
        agent: &AgentConfig,
        context: &ContextConfig,
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        index: Arc<dyn SimilarityIndex>,
        journeys: Arc<dyn JourneyRegistry>,
    ) -> Self {
        Self {
            persona: Persona::new(agent),
            history_window: context.history_window,
            storage,
            journeys,
            retriever: Retriever::new(embedder, index, context),
        }
    }

    /// Builds the prompt pair for `current`, which must already be persisted
    /// so the history window can be anchored on it.
    pub async fn assemble(
        &self,
        conversation: &Conversation,
        current: &Message,
    ) -> Result<AssembledPrompt, ReverieError> {
        let history = self
            .storage
            .messages_before(&current.id, self.history_window)
            .await?;

        let evidence = self.storage.list_evidence(None).await?;
        let narrative = self.storage.get_narrative().await?;
        let profile = Profile::from_evidence(&evidence);
        let summary = profile.summary_text(narrative.as_ref());

        let exclude: HashSet<String> = history
            .iter()
            .map(|m| m.id.clone())
            .chain(std::iter::once(current.id.clone()))
            .collect();
        let retrieved = self.retriever.retrieve(&current.content, &exclude).await;

        let journey = conversation
            .journey_id
            .as_deref()
            .and_then(|id| self.journeys.get(id));

        let system = match &journey {
            Some(journey) => persona::journey_prompt(&journey.system_prompt, &summary, &retrieved),
            None => {
                let intent = style::current_intent(&evidence, &conversation.id);
                let style = style::style_guidance(&profile, intent);
                self.persona.standard_prompt(&summary, &retrieved, &style)
            }
        };

        debug!(
            conversation_id = %conversation.id,
            history = history.len(),
            evidence = evidence.len(),
            retrieved_messages = retrieved.messages.len(),
            retrieved_insights = retrieved.insights.len(),
            journey = journey.as_ref().map(|j| j.id.as_str()),
            "context assembled"
        );

        Ok(AssembledPrompt {
            system,
            user: history::user_prompt(&history, &current.content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_core::traits::similarity::{INSIGHTS_COLLECTION, MESSAGES_COLLECTION};
    use reverie_core::{
        EmbedKind, Evidence, Extraction, ExtractionStatus, GuidedOnboardingState, Journey,
        NarrativeSummary, Role, SignalCategory,
    };
    use reverie_memory::SqliteSimilarityIndex;
    use reverie_storage::{Database, SqliteStorage};
    use reverie_test_utils::MockEmbedder;

    const DIM: usize = 32;

    struct Journeys(Vec<Journey>);

    impl JourneyRegistry for Journeys {
        fn get(&self, id: &str) -> Option<Journey> {
            self.0.iter().find(|j| j.id == id).cloned()
        }

        fn list(&self) -> Vec<Journey> {
            self.0.clone()
        }
    }

    struct Fixture {
        storage: Arc<SqliteStorage>,
        index: Arc<SqliteSimilarityIndex>,
        assembler: ContextAssembler,
    }

    async fn fixture_with(embedder: MockEmbedder, context: ContextConfig) -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let storage = Arc::new(SqliteStorage::from_database(db.clone()));
        let index = Arc::new(SqliteSimilarityIndex::new(db, DIM));
        let journeys = Arc::new(Journeys(vec![Journey {
            id: "values".into(),
            title: "Discover your values".into(),
            description: String::new(),
            system_prompt: "You are guiding a values exercise.".into(),
        }]));
        let assembler = ContextAssembler::new(
            &AgentConfig::default(),
            &context,
            storage.clone(),
            Arc::new(embedder),
            index.clone(),
            journeys,
        );
        Fixture {
            storage,
            index,
            assembler,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(MockEmbedder::new(DIM), ContextConfig::default()).await
    }

    async fn conversation(
        storage: &SqliteStorage,
        id: &str,
        journey: Option<&str>,
    ) -> Conversation {
        let conversation = Conversation {
            id: id.into(),
            title: None,
            journey_id: journey.map(str::to_string),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let state = GuidedOnboardingState::initial(id, journey.is_some(), &conversation.created_at);
        storage.create_conversation(&conversation, &state).await.unwrap();
        conversation
    }

    async fn message(
        storage: &SqliteStorage,
        conv: &str,
        n: u32,
        role: Role,
        text: &str,
    ) -> Message {
        let message = Message {
            id: format!("{conv}-m{n}"),
            conversation_id: conv.into(),
            role,
            content: text.into(),
            prompt: None,
            created_at: format!("2026-01-01T00:00:{n:02}.000Z"),
        };
        storage.insert_message(&message).await.unwrap();
        message
    }

    async fn add_evidence(
        storage: &SqliteStorage,
        msg: &Message,
        category: SignalCategory,
        label: &str,
    ) {
        let extraction = Extraction {
            id: format!("x-{label}"),
            message_id: msg.id.clone(),
            conversation_id: msg.conversation_id.clone(),
            payload: None,
            status: ExtractionStatus::Pending,
            error: None,
            created_at: msg.created_at.clone(),
        };
        assert!(storage.insert_extraction(&extraction).await.unwrap());
        let evidence = Evidence {
            id: format!("e-{label}"),
            extraction_id: extraction.id.clone(),
            message_id: msg.id.clone(),
            conversation_id: msg.conversation_id.clone(),
            category,
            label: label.into(),
            detail: None,
            confidence: 0.9,
            quote: msg.content.clone(),
            created_at: msg.created_at.clone(),
        };
        assert!(
            storage
                .validate_extraction(&extraction.id, "{}", &[evidence])
                .await
                .unwrap()
        );
    }

    async fn index_message(index: &SqliteSimilarityIndex, msg: &Message) {
        let vector = MockEmbedder::new(DIM)
            .embed(&msg.content, EmbedKind::Document)
            .await
            .unwrap();
        let metadata = serde_json::json!({"content": msg.content});
        index
            .upsert(MESSAGES_COLLECTION, &msg.id, &vector, metadata)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_turn_uses_placeholder_and_adaptive_style() {
        let f = fixture().await;
        let conv = conversation(&f.storage, "c1", None).await;
        let current = message(&f.storage, "c1", 1, Role::User, "Hello there").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();

        assert!(prompt.system.starts_with("You are Reverie"));
        assert!(prompt.system.contains(NO_PROFILE_PLACEHOLDER));
        assert!(prompt.system.contains(ADAPTIVE_DIRECTIVE));
        assert_eq!(prompt.user, "Hello there");
    }

    #[tokio::test]
    async fn journey_prompt_takes_precedence_without_style() {
        let f = fixture().await;
        let conv = conversation(&f.storage, "c1", Some("values")).await;
        let current = message(&f.storage, "c1", 1, Role::User, "Let's begin").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();

        assert!(prompt.system.starts_with("You are guiding a values exercise."));
        assert!(prompt.system.contains(NO_PROFILE_PLACEHOLDER));
        assert!(!prompt.system.contains("## Style"));
    }

    #[tokio::test]
    async fn unknown_journey_falls_back_to_standard_prompt() {
        let f = fixture().await;
        let conv = conversation(&f.storage, "c1", Some("retired-journey")).await;
        let current = message(&f.storage, "c1", 1, Role::User, "Hi").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();
        assert!(prompt.system.starts_with("You are Reverie"));
        assert!(prompt.system.contains("## Style"));
    }

    #[tokio::test]
    async fn history_window_is_bounded_and_oldest_first() {
        let context = ContextConfig {
            history_window: 2,
            ..ContextConfig::default()
        };
        let f = fixture_with(MockEmbedder::new(DIM), context).await;
        let conv = conversation(&f.storage, "c1", None).await;
        message(&f.storage, "c1", 1, Role::User, "first").await;
        message(&f.storage, "c1", 2, Role::Assistant, "second").await;
        message(&f.storage, "c1", 3, Role::User, "third").await;
        let current = message(&f.storage, "c1", 4, Role::User, "fourth").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();

        assert!(!prompt.user.contains("first"));
        let second = prompt.user.find("Assistant: second").unwrap();
        let third = prompt.user.find("User: third").unwrap();
        assert!(second < third);
        assert!(prompt.user.ends_with("Current message:\nfourth"));
    }

    #[tokio::test]
    async fn profile_and_style_come_from_evidence() {
        let f = fixture().await;
        let conv = conversation(&f.storage, "c1", None).await;
        let earlier = message(&f.storage, "c1", 1, Role::User, "Family matters most").await;
        add_evidence(&f.storage, &earlier, SignalCategory::Value, "family").await;
        add_evidence(&f.storage, &earlier, SignalCategory::SupportStyle, "practical").await;
        let current = message(&f.storage, "c1", 2, Role::User, "What should I do?").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();

        assert!(prompt.system.contains("- Value: family"));
        assert!(!prompt.system.contains(NO_PROFILE_PLACEHOLDER));
        assert!(prompt.system.contains("practical support"));
        assert!(!prompt.system.contains(ADAPTIVE_DIRECTIVE));
    }

    #[tokio::test]
    async fn intent_from_another_conversation_is_ignored() {
        let f = fixture().await;
        conversation(&f.storage, "old", None).await;
        let old = message(&f.storage, "old", 1, Role::User, "I just need to vent").await;
        add_evidence(&f.storage, &old, SignalCategory::ImmediateIntent, "vent").await;

        let conv = conversation(&f.storage, "c1", None).await;
        let current = message(&f.storage, "c1", 2, Role::User, "Help me plan the week").await;
        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();
        assert!(!prompt.system.contains("want: vent"));
        assert!(prompt.system.contains(ADAPTIVE_DIRECTIVE));

        add_evidence(&f.storage, &current, SignalCategory::ImmediateIntent, "plan").await;
        let next = message(&f.storage, "c1", 3, Role::User, "Monday first").await;
        let prompt = f.assembler.assemble(&conv, &next).await.unwrap();
        assert!(prompt.system.contains("want: plan"));
    }

    #[tokio::test]
    async fn narrative_is_folded_into_profile() {
        let f = fixture().await;
        f.storage
            .save_narrative(&NarrativeSummary {
                identity_summary: "A nurse rebuilding after burnout.".into(),
                current_phase: "recovery".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let conv = conversation(&f.storage, "c1", None).await;
        let current = message(&f.storage, "c1", 1, Role::User, "Hi").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();
        assert!(prompt.system.contains("A nurse rebuilding after burnout."));
        assert!(prompt.system.contains("Current phase: recovery"));
    }

    #[tokio::test]
    async fn retrieves_past_entries_outside_history() {
        let context = ContextConfig {
            history_window: 1,
            similarity_threshold: 0.1,
            ..ContextConfig::default()
        };
        let f = fixture_with(MockEmbedder::new(DIM), context).await;

        conversation(&f.storage, "old", None).await;
        let past = message(&f.storage, "old", 1, Role::User, "my sister visited last spring").await;
        index_message(&f.index, &past).await;

        let conv = conversation(&f.storage, "c1", None).await;
        let recent = message(&f.storage, "c1", 2, Role::User, "my sister called today").await;
        index_message(&f.index, &recent).await;
        let current = message(&f.storage, "c1", 3, Role::User, "my sister is coming over").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();

        assert!(prompt.system.contains("- my sister visited last spring"));
        // Already in the history window, so not repeated as a related entry.
        assert!(!prompt.system.contains("- my sister called today"));
        assert!(prompt.user.contains("User: my sister called today"));
    }

    #[tokio::test]
    async fn insights_are_retrieved() {
        let context = ContextConfig {
            similarity_threshold: 0.1,
            ..ContextConfig::default()
        };
        let f = fixture_with(MockEmbedder::new(DIM), context).await;
        let vector = MockEmbedder::new(DIM)
            .embed("work stress keeps coming up", EmbedKind::Document)
            .await
            .unwrap();
        f.index
            .upsert(
                INSIGHTS_COLLECTION,
                "narrative",
                &vector,
                serde_json::json!({"content": "work stress keeps coming up"}),
            )
            .await
            .unwrap();
        let conv = conversation(&f.storage, "c1", None).await;
        let current = message(&f.storage, "c1", 1, Role::User, "work stress again").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();
        assert!(prompt.system.contains("## Related insights\n- work stress keeps coming up"));
    }

    #[tokio::test]
    async fn retrieval_skipped_while_embedder_warms_up() {
        let context = ContextConfig {
            similarity_threshold: 0.0,
            ..ContextConfig::default()
        };
        let f = fixture_with(MockEmbedder::not_ready(DIM), context).await;
        conversation(&f.storage, "old", None).await;
        let past = message(&f.storage, "old", 1, Role::User, "exactly the same words").await;
        index_message(&f.index, &past).await;

        let conv = conversation(&f.storage, "c1", None).await;
        let current = message(&f.storage, "c1", 2, Role::User, "exactly the same words").await;

        let prompt = f.assembler.assemble(&conv, &current).await.unwrap();
        assert!(!prompt.system.contains("Related past entries"));
    }

    #[test]
    fn transcript_contains_both_halves() {
        let prompt = AssembledPrompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        assert_eq!(prompt.transcript(), "SYSTEM:\nsys\n\nUSER:\nusr");
    }
}
