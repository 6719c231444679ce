// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::ReverieError;
use crate::onboarding::GuidedOnboardingState;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Conversation, Evidence, Extraction, Message, NarrativeSummary, Role,
};

/// Adapter for storage and persistence backends.
///
/// Every operation that touches more than one row runs as a single atomic
/// unit: callers never observe a partially applied cascade.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, pragmas).
    async fn initialize(&self) -> Result<(), ReverieError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ReverieError>;

    // --- Conversations ---

    /// Creates a conversation together with its onboarding record.
    async fn create_conversation(
        &self,
        conversation: &Conversation,
        onboarding: &GuidedOnboardingState,
    ) -> Result<(), ReverieError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ReverieError>;

    /// Lists conversations, most recently updated first.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ReverieError>;

    /// The most recently updated conversation, if any.
    async fn latest_conversation(&self) -> Result<Option<Conversation>, ReverieError>;

    async fn set_conversation_title(&self, id: &str, title: &str) -> Result<(), ReverieError>;

    /// Deletes a conversation and everything it owns. Returns the ids of the
    /// removed messages so derived indexes can be cleaned up.
    async fn delete_conversation(&self, id: &str) -> Result<Vec<String>, ReverieError>;

    // --- Messages ---

    /// Appends a message and refreshes the owning conversation's `updated_at`.
    async fn insert_message(&self, message: &Message) -> Result<(), ReverieError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, ReverieError>;

    /// All messages of a conversation in append order.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ReverieError>;

    /// Up to `limit` messages preceding `message_id` in its conversation,
    /// oldest first.
    async fn messages_before(
        &self,
        message_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ReverieError>;

    /// Counts messages, optionally restricted to one conversation and role.
    async fn count_messages(
        &self,
        conversation_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<i64, ReverieError>;

    /// Deletes one message with its extractions and evidence. Returns `false`
    /// if the message did not exist.
    async fn delete_message(&self, id: &str) -> Result<bool, ReverieError>;

    /// Deletes every message of the conversation created strictly after the
    /// reference message, with their dependents. Returns the removed ids.
    async fn delete_messages_after(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Vec<String>, ReverieError>;

    // --- Extractions and evidence ---

    /// Records a pending extraction. Returns `false` without writing when the
    /// owning message no longer exists.
    async fn insert_extraction(&self, extraction: &Extraction) -> Result<bool, ReverieError>;

    /// Stores the evidence rows and marks the extraction validated in one
    /// transaction. Returns `false` when the extraction vanished meanwhile.
    async fn validate_extraction(
        &self,
        extraction_id: &str,
        payload: &str,
        evidence: &[Evidence],
    ) -> Result<bool, ReverieError>;

    /// Marks an extraction rejected with the given reason.
    async fn reject_extraction(
        &self,
        extraction_id: &str,
        payload: Option<&str>,
        reason: &str,
    ) -> Result<bool, ReverieError>;

    async fn get_extractions(&self, message_id: &str) -> Result<Vec<Extraction>, ReverieError>;

    /// Deletes all extractions and evidence of a conversation. Returns the
    /// number of extractions removed.
    async fn delete_extractions_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<usize, ReverieError>;

    /// Evidence rows in creation order, optionally for one conversation.
    async fn list_evidence(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<Evidence>, ReverieError>;

    // --- Narrative ---

    async fn get_narrative(&self) -> Result<Option<NarrativeSummary>, ReverieError>;

    /// Replaces the current narrative summary.
    async fn save_narrative(&self, narrative: &NarrativeSummary) -> Result<(), ReverieError>;

    // --- Guided onboarding ---

    async fn get_onboarding_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<GuidedOnboardingState>, ReverieError>;

    async fn save_onboarding_state(
        &self,
        state: &GuidedOnboardingState,
    ) -> Result<(), ReverieError>;
}
