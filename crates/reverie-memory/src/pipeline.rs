// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background signal extraction.
//!
//! For every saved user message the pipeline indexes the message embedding,
//! asks the provider for a structured signal payload, validates it, merges
//! evidence into storage and then refreshes the narrative and the guided
//! onboarding state. Nothing here is retried; failures are recorded on the
//! extraction row and logged by the caller.

use std::sync::Arc;

use reverie_config::model::MemoryConfig;
use reverie_core::traits::similarity::{INSIGHTS_COLLECTION, MESSAGES_COLLECTION};
use reverie_core::{
    ChatMessage, DeactivationReason, EmbedKind, EmbeddingAdapter, Evidence, Extraction,
    ExtractionStatus, GenerateOptions, Message, NarrativeSummary, ProviderAdapter, ReverieError,
    Role, SimilarityIndex, StorageAdapter,
};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::narrative;
use crate::profile::Profile;
use crate::schema::{parse_payload, validate_payload};

/// Preceding messages shown to the model alongside the analysed message.
const CONTEXT_MESSAGES: usize = 6;

/// Id of the single narrative entry in the insights collection.
const NARRATIVE_INSIGHT_ID: &str = "narrative";

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You analyse a single journal message and extract psychological signals about its author.
Return one JSON object. Every key is optional and holds an array of signals:
quotes, values, challenges, goals, need_states, life_situation, immediate_intent,
emotional_tone, moral_foundations, support_style, risk_tolerance, motivation_style,
locus_of_control, temporal_orientation, growth_mindset, personality_traits,
attachment_style, change_readiness, stress_response, emotional_regulation, self_efficacy.

Each signal is {"label": string, "detail": string (optional), "confidence": number 0-1, "quote": string}.
- "quote" MUST be copied verbatim from the MESSAGE, never from the context.
- need_states labels use Maslow levels: physiological, safety, belonging, esteem, self_actualization.
- support_style labels: validation, problem_solving, perspective, encouragement, space.
- change_readiness labels: precontemplation, contemplation, preparation, action, maintenance.
Only report what the message supports. If nothing applies, return {}.
Output JSON only."#;

/// How one extraction attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Validated { extraction_id: String, signals: usize },
    Rejected { extraction_id: String, reason: String },
    /// The message was deleted before the result could be stored.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReanalysisStatus {
    Running,
    Completed,
}

/// Emitted once per re-analysed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReanalysisProgress {
    pub status: ReanalysisStatus,
    pub current: usize,
    pub total: usize,
}

/// Totals of a finished re-analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReanalysisReport {
    pub total: usize,
    pub validated: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Turns user messages into durable profile evidence.
pub struct ExtractionPipeline {
    storage: Arc<dyn StorageAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    index: Arc<dyn SimilarityIndex>,
    config: MemoryConfig,
    narrative_lock: Mutex<()>,
}

impl ExtractionPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        index: Arc<dyn SimilarityIndex>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            index,
            config,
            narrative_lock: Mutex::new(()),
        }
    }

    /// Runs the full pipeline for one saved user message.
    pub async fn process_message(
        &self,
        provider: &dyn ProviderAdapter,
        message: &Message,
    ) -> Result<ExtractionOutcome, ReverieError> {
        if message.role != Role::User {
            return Err(ReverieError::Validation(
                "only user messages are analysed".into(),
            ));
        }

        self.index_message(message).await;

        let outcome = self.extract(provider, message).await?;
        if matches!(outcome, ExtractionOutcome::Validated { .. }) {
            if let Err(e) = self.refresh_narrative(provider).await {
                warn!(error = %e, "narrative regeneration failed");
            }
            if let Err(e) = self.check_onboarding(&message.conversation_id).await {
                warn!(
                    conversation_id = %message.conversation_id,
                    error = %e,
                    "onboarding check failed"
                );
            }
        }
        Ok(outcome)
    }

    /// Stores the message embedding for later retrieval. Skipped while the
    /// embedder is warming up; failures are only logged.
    async fn index_message(&self, message: &Message) {
        if !self.embedder.is_ready() {
            debug!(message_id = %message.id, "embedder not ready, message not indexed");
            return;
        }

        let result = async {
            let vector = self
                .embedder
                .embed(&message.content, EmbedKind::Document)
                .await?;
            let metadata = serde_json::json!({
                "conversation_id": message.conversation_id,
                "content": message.content,
                "created_at": message.created_at,
            });
            self.index
                .upsert(MESSAGES_COLLECTION, &message.id, &vector, metadata)
                .await
        }
        .await;

        if let Err(e) = result {
            warn!(message_id = %message.id, error = %e, "failed to index message");
        }
    }

    /// Extracts, validates and merges signals for one message.
    pub async fn extract(
        &self,
        provider: &dyn ProviderAdapter,
        message: &Message,
    ) -> Result<ExtractionOutcome, ReverieError> {
        let extraction = Extraction {
            id: Uuid::new_v4().to_string(),
            message_id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
            payload: None,
            status: ExtractionStatus::Pending,
            error: None,
            created_at: crate::timestamp(),
        };
        if !self.storage.insert_extraction(&extraction).await? {
            info!(message_id = %message.id, "message deleted before extraction, skipping");
            return Ok(ExtractionOutcome::Discarded);
        }

        let context = self.storage.messages_before(&message.id, CONTEXT_MESSAGES).await?;
        let prompt = build_extraction_prompt(&context, &message.content);
        let options = GenerateOptions {
            max_tokens: self.config.extraction_max_tokens,
            temperature: Some(0.0),
        };

        let response = match provider
            .generate_text(
                &[ChatMessage::user(prompt)],
                Some(EXTRACTION_SYSTEM_PROMPT),
                &options,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.storage
                    .reject_extraction(&extraction.id, None, &format!("provider error: {e}"))
                    .await?;
                return Err(e);
            }
        };

        let validated = parse_payload(&response)
            .and_then(|payload| validate_payload(&payload, &message.content));
        let validated = match validated {
            Ok(validated) => validated,
            Err(e) => {
                let reason = e.to_string();
                warn!(message_id = %message.id, reason = %reason, "extraction rejected");
                self.storage
                    .reject_extraction(&extraction.id, Some(&response), &reason)
                    .await?;
                return Ok(ExtractionOutcome::Rejected {
                    extraction_id: extraction.id,
                    reason,
                });
            }
        };

        let now = crate::timestamp();
        let evidence: Vec<Evidence> = validated
            .signals
            .into_iter()
            .map(|signal| Evidence {
                id: Uuid::new_v4().to_string(),
                extraction_id: extraction.id.clone(),
                message_id: message.id.clone(),
                conversation_id: message.conversation_id.clone(),
                category: signal.category,
                label: signal.label,
                detail: signal.detail,
                confidence: signal.confidence,
                quote: signal.quote,
                created_at: now.clone(),
            })
            .collect();

        if !self
            .storage
            .validate_extraction(&extraction.id, &response, &evidence)
            .await?
        {
            info!(message_id = %message.id, "message deleted during extraction, discarding");
            return Ok(ExtractionOutcome::Discarded);
        }

        info!(
            message_id = %message.id,
            signals = evidence.len(),
            unsupported = validated.unsupported,
            "extraction validated"
        );
        Ok(ExtractionOutcome::Validated {
            extraction_id: extraction.id,
            signals: evidence.len(),
        })
    }

    /// Regenerates the narrative when due. Returns whether a new one was saved.
    pub async fn refresh_narrative(
        &self,
        provider: &dyn ProviderAdapter,
    ) -> Result<bool, ReverieError> {
        let _guard = self.narrative_lock.lock().await;

        let user_messages = self.storage.count_messages(None, Some(Role::User)).await?;
        let current = self.storage.get_narrative().await?;
        if !narrative::should_regenerate(
            current.as_ref(),
            user_messages,
            self.config.narrative_interval,
        ) {
            return Ok(false);
        }

        let profile = Profile::from_evidence(&self.storage.list_evidence(None).await?);
        if profile.is_empty() {
            debug!("no evidence yet, narrative not generated");
            return Ok(false);
        }

        let summary = narrative::synthesize(
            provider,
            &profile,
            current.as_ref(),
            user_messages,
            self.config.extraction_max_tokens,
            &crate::timestamp(),
        )
        .await?;
        self.storage.save_narrative(&summary).await?;
        info!(user_messages, "narrative regenerated");

        self.index_insight(&summary).await;
        Ok(true)
    }

    async fn index_insight(&self, summary: &NarrativeSummary) {
        if !self.embedder.is_ready() {
            return;
        }
        let result = async {
            let vector = self
                .embedder
                .embed(&summary.identity_summary, EmbedKind::Document)
                .await?;
            let metadata = serde_json::json!({
                "kind": "narrative",
                "content": summary.identity_summary,
                "updated_at": summary.updated_at,
            });
            self.index
                .upsert(INSIGHTS_COLLECTION, NARRATIVE_INSIGHT_ID, &vector, metadata)
                .await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "failed to index narrative insight");
        }
    }

    /// Ends guided onboarding once the profile, built from evidence across
    /// every conversation, forms a complete baseline. Returns whether a
    /// transition happened.
    pub async fn check_onboarding(&self, conversation_id: &str) -> Result<bool, ReverieError> {
        let Some(mut state) = self.storage.get_onboarding_state(conversation_id).await? else {
            return Ok(false);
        };
        if !state.is_active {
            return Ok(false);
        }

        let evidence = self.storage.list_evidence(None).await?;
        if !Profile::from_evidence(&evidence).baseline_complete() {
            return Ok(false);
        }

        if state.deactivate(DeactivationReason::BaselineMet, &crate::timestamp()) {
            self.storage.save_onboarding_state(&state).await?;
            info!(conversation_id, "guided onboarding complete");
            return Ok(true);
        }
        Ok(false)
    }

    /// Deletes every extraction of the conversation and replays extraction
    /// for each user message in order. Per-message failures are counted and
    /// skipped. Exactly `total` progress events are sent, the last one with
    /// [`ReanalysisStatus::Completed`]; an empty conversation sends a single
    /// completed event.
    pub async fn reanalyze_conversation(
        &self,
        provider: &dyn ProviderAdapter,
        conversation_id: &str,
        progress: &mpsc::Sender<ReanalysisProgress>,
    ) -> Result<ReanalysisReport, ReverieError> {
        if self.storage.get_conversation(conversation_id).await?.is_none() {
            return Err(ReverieError::not_found("conversation", conversation_id));
        }

        let removed = self
            .storage
            .delete_extractions_for_conversation(conversation_id)
            .await?;
        let messages: Vec<Message> = self
            .storage
            .get_messages(conversation_id)
            .await?
            .into_iter()
            .filter(|m| m.role == Role::User)
            .collect();

        let total = messages.len();
        info!(conversation_id, removed, total, "re-analysis started");

        let mut report = ReanalysisReport {
            total,
            ..Default::default()
        };
        if total == 0 {
            let _ = progress
                .send(ReanalysisProgress {
                    status: ReanalysisStatus::Completed,
                    current: 0,
                    total: 0,
                })
                .await;
            return Ok(report);
        }

        for (i, message) in messages.iter().enumerate() {
            match self.extract(provider, message).await {
                Ok(ExtractionOutcome::Validated { .. }) => {
                    report.validated += 1;
                    if let Err(e) = self.refresh_narrative(provider).await {
                        warn!(error = %e, "narrative regeneration failed");
                    }
                }
                Ok(ExtractionOutcome::Rejected { .. }) => report.rejected += 1,
                Ok(ExtractionOutcome::Discarded) => report.failed += 1,
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "re-analysis step failed");
                    report.failed += 1;
                }
            }

            let current = i + 1;
            let status = if current == total {
                ReanalysisStatus::Completed
            } else {
                ReanalysisStatus::Running
            };
            // A dropped receiver only means nobody is watching.
            let _ = progress
                .send(ReanalysisProgress {
                    status,
                    current,
                    total,
                })
                .await;
        }

        info!(
            conversation_id,
            validated = report.validated,
            rejected = report.rejected,
            failed = report.failed,
            "re-analysis finished"
        );
        Ok(report)
    }
}

fn build_extraction_prompt(context: &[Message], message: &str) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str("CONTEXT (earlier in the conversation, for reference only):\n");
        for m in context {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{speaker}: {}\n", m.content));
        }
        prompt.push('\n');
    }
    prompt.push_str("MESSAGE:\n");
    prompt.push_str(message);
    prompt
}
