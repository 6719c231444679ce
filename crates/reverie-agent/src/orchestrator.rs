// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestrator: drives one conversational turn from inbound text to a
//! persisted reply and a dispatched background extraction.
//!
//! Each turn moves through the stages of [`TurnStage`]:
//! Received -> ConversationResolved -> UserMessagePersisted -> ContextAssembled
//! -> Generating -> ResponsePersisted -> ExtractionDispatched -> Done.
//! `Errored` is reachable from every stage.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use futures::StreamExt;
use reverie_context::{AssembledPrompt, ContextAssembler};
use reverie_core::traits::similarity::MESSAGES_COLLECTION;
use reverie_core::{
    ChatMessage, Conversation, GenerateOptions, GuidedOnboardingState, JourneyRegistry, Message,
    NarrativeSummary, ProviderAdapter, ReverieError, Role, SimilarityIndex, StorageAdapter,
    StreamEvent, TextStream,
};
use reverie_memory::{ExtractionPipeline, Profile, ReanalysisProgress, ReanalysisReport};
use serde::Serialize;
use strum::Display;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::manager::ProviderManager;
use crate::title::generate_title;

/// Capacity of the per-turn event channel.
const TURN_EVENT_BUFFER: usize = 32;

/// Stages of a single turn, logged as the turn advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TurnStage {
    Received,
    ConversationResolved,
    UserMessagePersisted,
    ContextAssembled,
    Generating,
    ResponsePersisted,
    ExtractionDispatched,
    Done,
    Errored,
}

/// Tracks and logs the stage of one turn.
#[derive(Debug)]
struct TurnTrace {
    turn_id: String,
    stage: TurnStage,
}

impl TurnTrace {
    fn new() -> Self {
        let trace = Self {
            turn_id: uuid::Uuid::new_v4().to_string(),
            stage: TurnStage::Received,
        };
        debug!(turn_id = %trace.turn_id, stage = %trace.stage, "turn stage");
        trace
    }

    fn advance(&mut self, stage: TurnStage) {
        self.stage = stage;
        debug!(turn_id = %self.turn_id, stage = %stage, "turn stage");
    }

    fn errored(&mut self, error: &ReverieError) {
        warn!(
            turn_id = %self.turn_id,
            failed_stage = %self.stage,
            error = %error,
            "turn failed"
        );
        self.stage = TurnStage::Errored;
    }
}

/// Result of a blocking turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    pub response: String,
    pub conversation_id: String,
    /// Assistant message id.
    pub message_id: String,
    /// Set when this turn gave the conversation its title.
    pub title: Option<String>,
}

/// Events of a streaming turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Chunk {
        text: String,
    },
    /// The backend entered a reasoning phase. Carries no text.
    Thinking,
    Done {
        conversation_id: String,
        message_id: String,
        title: Option<String>,
    },
    Error {
        message: String,
    },
}

/// A conversation with its messages and onboarding record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub onboarding: Option<GuidedOnboardingState>,
}

/// The accumulated profile with the current narrative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub profile: Profile,
    pub narrative: Option<NarrativeSummary>,
}

/// Everything decided before generation starts.
struct PreparedTurn {
    conversation: Conversation,
    user_message: Message,
    title: Option<String>,
    prompt: AssembledPrompt,
    provider: Arc<dyn ProviderAdapter>,
    options: GenerateOptions,
}

impl PreparedTurn {
    fn messages(&self) -> [ChatMessage; 1] {
        [ChatMessage::user(self.prompt.user.clone())]
    }
}

/// Drives conversational turns and conversation management.
pub struct TurnOrchestrator {
    storage: Arc<dyn StorageAdapter>,
    manager: Arc<ProviderManager>,
    assembler: Arc<ContextAssembler>,
    /// `None` when memory is disabled; turns then skip extraction.
    pipeline: Option<Arc<ExtractionPipeline>>,
    index: Arc<dyn SimilarityIndex>,
    journeys: Arc<dyn JourneyRegistry>,
    tracker: TaskTracker,
}

impl TurnOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        manager: Arc<ProviderManager>,
        assembler: Arc<ContextAssembler>,
        pipeline: Option<Arc<ExtractionPipeline>>,
        index: Arc<dyn SimilarityIndex>,
        journeys: Arc<dyn JourneyRegistry>,
    ) -> Self {
        Self {
            storage,
            manager,
            assembler,
            pipeline,
            index,
            journeys,
            tracker: TaskTracker::new(),
        }
    }

    /// Tracker for background extraction and streaming tasks.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Waits until every background task spawned so far has finished.
    pub async fn wait_for_background(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    // --- Turns ---

    /// Runs a complete blocking turn.
    pub async fn send_turn(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<TurnReply, ReverieError> {
        let mut turn = TurnTrace::new();
        let result = self.run_blocking(&mut turn, text, conversation_id).await;
        if let Err(e) = &result {
            turn.errored(e);
        }
        result
    }

    async fn run_blocking(
        &self,
        turn: &mut TurnTrace,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<TurnReply, ReverieError> {
        let prepared = self.prepare(turn, text, conversation_id).await?;

        turn.advance(TurnStage::Generating);
        let response = prepared
            .provider
            .generate_text(
                &prepared.messages(),
                Some(&prepared.prompt.system),
                &prepared.options,
            )
            .await?;
        if response.trim().is_empty() {
            return Err(ReverieError::EmptyGeneration);
        }

        self.complete(turn, prepared, response).await
    }

    /// Starts a streaming turn.
    ///
    /// Failures before generation starts (empty input, unknown conversation,
    /// uninitialized provider) are returned directly. Afterwards every outcome
    /// arrives on the channel, ending with exactly one `Done` or `Error`.
    /// Dropping the receiver stops generation and nothing more is persisted.
    pub async fn stream_turn(
        self: &Arc<Self>,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<mpsc::Receiver<TurnEvent>, ReverieError> {
        let mut turn = TurnTrace::new();
        let started = async {
            let prepared = self.prepare(&mut turn, text, conversation_id).await?;
            turn.advance(TurnStage::Generating);
            let stream = prepared
                .provider
                .stream_text(
                    &prepared.messages(),
                    Some(&prepared.prompt.system),
                    &prepared.options,
                )
                .await?;
            Ok::<_, ReverieError>((prepared, stream))
        }
        .await;

        let (prepared, stream) = match started {
            Ok(started) => started,
            Err(e) => {
                turn.errored(&e);
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::channel(TURN_EVENT_BUFFER);
        let this = Arc::clone(self);
        self.tracker.spawn(async move {
            this.forward(turn, prepared, stream, tx).await;
        });
        Ok(rx)
    }

    async fn forward(
        &self,
        mut turn: TurnTrace,
        prepared: PreparedTurn,
        mut stream: TextStream,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let mut text = String::new();
        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    info!(
                        turn_id = %turn.turn_id,
                        conversation_id = %prepared.conversation.id,
                        "consumer disconnected, abandoning turn"
                    );
                    return;
                }
                next = stream.next() => next,
            };

            let event = match next {
                None => break,
                Some(Ok(StreamEvent::TextChunk(chunk))) => {
                    text.push_str(&chunk);
                    TurnEvent::Chunk { text: chunk }
                }
                Some(Ok(StreamEvent::ThinkingStarted)) => TurnEvent::Thinking,
                Some(Err(e)) => {
                    turn.errored(&e);
                    let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
                    return;
                }
            };
            if tx.send(event).await.is_err() {
                info!(turn_id = %turn.turn_id, "consumer disconnected, abandoning turn");
                return;
            }
        }
        drop(stream);

        if text.trim().is_empty() {
            let e = ReverieError::EmptyGeneration;
            turn.errored(&e);
            let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
            return;
        }
        if tx.is_closed() {
            info!(turn_id = %turn.turn_id, "consumer disconnected, abandoning turn");
            return;
        }

        let event = match self.complete(&mut turn, prepared, text).await {
            Ok(reply) => TurnEvent::Done {
                conversation_id: reply.conversation_id,
                message_id: reply.message_id,
                title: reply.title,
            },
            Err(e) => {
                turn.errored(&e);
                TurnEvent::Error { message: e.to_string() }
            }
        };
        let _ = tx.send(event).await;
    }

    /// Validates input, resolves the conversation, persists the user message
    /// and assembles the prompt.
    async fn prepare(
        &self,
        turn: &mut TurnTrace,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<PreparedTurn, ReverieError> {
        if text.trim().is_empty() {
            return Err(ReverieError::EmptyInput);
        }
        let provider = self.manager.get_provider()?;
        let options = self.manager.generate_options();

        let mut conversation = self.resolve_conversation(conversation_id).await?;
        turn.advance(TurnStage::ConversationResolved);

        let user_message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            role: Role::User,
            content: text.to_string(),
            prompt: None,
            created_at: timestamp(),
        };
        self.storage.insert_message(&user_message).await?;
        conversation.updated_at = user_message.created_at.clone();
        turn.advance(TurnStage::UserMessagePersisted);

        let title = match conversation.title {
            Some(_) => None,
            None => {
                let title = generate_title(text, chrono::Utc::now().date_naive());
                self.storage
                    .set_conversation_title(&conversation.id, &title)
                    .await?;
                conversation.title = Some(title.clone());
                Some(title)
            }
        };

        let prompt = self.assembler.assemble(&conversation, &user_message).await?;
        turn.advance(TurnStage::ContextAssembled);

        Ok(PreparedTurn {
            conversation,
            user_message,
            title,
            prompt,
            provider,
            options,
        })
    }

    /// Persists the reply with its exact prompt and dispatches extraction.
    async fn complete(
        &self,
        turn: &mut TurnTrace,
        prepared: PreparedTurn,
        response: String,
    ) -> Result<TurnReply, ReverieError> {
        let reply = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: prepared.conversation.id.clone(),
            role: Role::Assistant,
            content: response,
            prompt: Some(prepared.prompt.transcript()),
            created_at: timestamp(),
        };
        self.storage.insert_message(&reply).await?;
        turn.advance(TurnStage::ResponsePersisted);

        self.dispatch_extraction(Arc::clone(&prepared.provider), prepared.user_message);
        turn.advance(TurnStage::ExtractionDispatched);

        info!(
            turn_id = %turn.turn_id,
            conversation_id = %prepared.conversation.id,
            message_id = %reply.id,
            chars = reply.content.len(),
            "turn complete"
        );
        turn.advance(TurnStage::Done);

        Ok(TurnReply {
            response: reply.content,
            conversation_id: prepared.conversation.id,
            message_id: reply.id,
            title: prepared.title,
        })
    }

    /// Fire-and-forget extraction of one user message. Failures are logged.
    fn dispatch_extraction(&self, provider: Arc<dyn ProviderAdapter>, message: Message) {
        let Some(pipeline) = self.pipeline.clone() else {
            return;
        };
        self.tracker.spawn(async move {
            match pipeline.process_message(provider.as_ref(), &message).await {
                Ok(outcome) => debug!(message_id = %message.id, ?outcome, "extraction finished"),
                Err(e) => warn!(message_id = %message.id, error = %e, "extraction failed"),
            }
        });
    }

    async fn resolve_conversation(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Conversation, ReverieError> {
        if let Some(id) = conversation_id {
            return self
                .storage
                .get_conversation(id)
                .await?
                .ok_or_else(|| ReverieError::not_found("conversation", id));
        }
        if let Some(latest) = self.storage.latest_conversation().await? {
            return Ok(latest);
        }
        self.create_conversation(None).await
    }

    async fn create_conversation(
        &self,
        journey_id: Option<&str>,
    ) -> Result<Conversation, ReverieError> {
        let now = timestamp();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            title: None,
            journey_id: journey_id.map(str::to_string),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let onboarding =
            GuidedOnboardingState::initial(&conversation.id, journey_id.is_some(), &now);
        self.storage
            .create_conversation(&conversation, &onboarding)
            .await?;
        info!(
            conversation_id = %conversation.id,
            journey_id = ?journey_id,
            "conversation created"
        );
        Ok(conversation)
    }

    // --- Conversation management ---

    /// Creates an empty conversation with onboarding inactive.
    pub async fn new_conversation(&self) -> Result<Conversation, ReverieError> {
        self.create_conversation(None).await
    }

    /// Creates a conversation for a known journey with onboarding active.
    pub async fn start_journey(&self, journey_id: &str) -> Result<Conversation, ReverieError> {
        let journey = self
            .journeys
            .get(journey_id)
            .ok_or_else(|| ReverieError::not_found("journey", journey_id))?;
        let conversation = self.create_conversation(Some(&journey.id)).await?;
        self.storage
            .set_conversation_title(&conversation.id, &journey.title)
            .await?;
        Ok(Conversation {
            title: Some(journey.title),
            ..conversation
        })
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ReverieError> {
        self.storage.list_conversations().await
    }

    pub async fn get_conversation(&self, id: &str) -> Result<ConversationDetail, ReverieError> {
        let conversation = self
            .storage
            .get_conversation(id)
            .await?
            .ok_or_else(|| ReverieError::not_found("conversation", id))?;
        let messages = self.storage.get_messages(id).await?;
        let onboarding = self.storage.get_onboarding_state(id).await?;
        Ok(ConversationDetail {
            conversation,
            messages,
            onboarding,
        })
    }

    /// Deletes the conversation with everything it owns, then drops its
    /// message vectors from the similarity index.
    pub async fn delete_conversation(&self, id: &str) -> Result<(), ReverieError> {
        if self.storage.get_conversation(id).await?.is_none() {
            return Err(ReverieError::not_found("conversation", id));
        }
        let removed = self.storage.delete_conversation(id).await?;
        info!(conversation_id = %id, messages = removed.len(), "conversation deleted");
        self.forget_vectors(&removed).await;
        Ok(())
    }

    pub async fn delete_message(&self, id: &str) -> Result<(), ReverieError> {
        if !self.storage.delete_message(id).await? {
            return Err(ReverieError::not_found("message", id));
        }
        self.forget_vectors(&[id.to_string()]).await;
        Ok(())
    }

    /// Deletes every message strictly after `message_id`. Returns how many
    /// messages were removed.
    pub async fn delete_messages_after(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<usize, ReverieError> {
        let removed = self
            .storage
            .delete_messages_after(conversation_id, message_id)
            .await?;
        self.forget_vectors(&removed).await;
        Ok(removed.len())
    }

    async fn forget_vectors(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.index.remove(MESSAGES_COLLECTION, ids).await {
            warn!(count = ids.len(), error = %e, "failed to remove message vectors");
        }
    }

    pub async fn profile(&self) -> Result<ProfileView, ReverieError> {
        let evidence = self.storage.list_evidence(None).await?;
        let narrative = self.storage.get_narrative().await?;
        Ok(ProfileView {
            profile: Profile::from_evidence(&evidence),
            narrative,
        })
    }

    pub async fn onboarding_state(
        &self,
        conversation_id: &str,
    ) -> Result<GuidedOnboardingState, ReverieError> {
        self.storage
            .get_onboarding_state(conversation_id)
            .await?
            .ok_or_else(|| ReverieError::not_found("conversation", conversation_id))
    }

    /// Re-runs extraction over every user message of the conversation with
    /// the active provider, reporting progress on `progress`.
    pub async fn reanalyze_conversation(
        &self,
        conversation_id: &str,
        progress: &mpsc::Sender<ReanalysisProgress>,
    ) -> Result<ReanalysisReport, ReverieError> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| ReverieError::Config("memory is disabled".to_string()))?;
        let provider = self.manager.get_provider()?;
        pipeline
            .reanalyze_conversation(provider.as_ref(), conversation_id, progress)
            .await
    }
}

/// Last millisecond handed out by [`timestamp`].
static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Current UTC time as an RFC 3339 string with millisecond precision.
///
/// Strictly increasing within the process, so messages written in the same
/// millisecond still order by `created_at` alone.
pub(crate) fn timestamp() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let previous = LAST_TIMESTAMP_MS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    let millis = now.max(previous + 1);
    chrono::DateTime::from_timestamp_millis(millis)
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
