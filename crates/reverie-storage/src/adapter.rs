// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use reverie_config::model::StorageConfig;
use reverie_core::{
    AdapterType, Conversation, Evidence, Extraction, GuidedOnboardingState, HealthStatus, Message,
    NarrativeSummary, PluginAdapter, ReverieError, Role, StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database, e.g. an in-memory one.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// The shared database handle, for components that keep their own tables
    /// on the same connection.
    pub fn database(&self) -> Result<&Database, ReverieError> {
        self.db()
    }

    fn db(&self) -> Result<&Database, ReverieError> {
        self.db
            .get()
            .ok_or_else(|| ReverieError::NotInitialized("storage".to_string()))
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), ReverieError> {
        if !self.config.wal_mode {
            return Ok(());
        }
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ReverieError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReverieError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ReverieError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| ReverieError::Storage {
                source: "storage already initialized".into(),
            })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ReverieError> {
        let db = self.db()?;
        self.checkpoint(db).await
    }

    // --- Conversations ---

    async fn create_conversation(
        &self,
        conversation: &Conversation,
        onboarding: &GuidedOnboardingState,
    ) -> Result<(), ReverieError> {
        queries::conversations::create_conversation(self.db()?, conversation, onboarding).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ReverieError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ReverieError> {
        queries::conversations::list_conversations(self.db()?).await
    }

    async fn latest_conversation(&self) -> Result<Option<Conversation>, ReverieError> {
        queries::conversations::latest_conversation(self.db()?).await
    }

    async fn set_conversation_title(&self, id: &str, title: &str) -> Result<(), ReverieError> {
        queries::conversations::set_title(self.db()?, id, title).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<Vec<String>, ReverieError> {
        queries::conversations::delete_conversation(self.db()?, id).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), ReverieError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, ReverieError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ReverieError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id).await
    }

    async fn messages_before(
        &self,
        message_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ReverieError> {
        queries::messages::messages_before(self.db()?, message_id, limit).await
    }

    async fn count_messages(
        &self,
        conversation_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<i64, ReverieError> {
        queries::messages::count_messages(self.db()?, conversation_id, role).await
    }

    async fn delete_message(&self, id: &str) -> Result<bool, ReverieError> {
        queries::messages::delete_message(self.db()?, id).await
    }

    async fn delete_messages_after(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Vec<String>, ReverieError> {
        queries::messages::delete_messages_after(self.db()?, conversation_id, message_id).await
    }

    // --- Extractions and evidence ---

    async fn insert_extraction(&self, extraction: &Extraction) -> Result<bool, ReverieError> {
        queries::extractions::insert_extraction(self.db()?, extraction).await
    }

    async fn validate_extraction(
        &self,
        extraction_id: &str,
        payload: &str,
        evidence: &[Evidence],
    ) -> Result<bool, ReverieError> {
        queries::extractions::validate_extraction(self.db()?, extraction_id, payload, evidence)
            .await
    }

    async fn reject_extraction(
        &self,
        extraction_id: &str,
        payload: Option<&str>,
        reason: &str,
    ) -> Result<bool, ReverieError> {
        queries::extractions::reject_extraction(self.db()?, extraction_id, payload, reason).await
    }

    async fn get_extractions(&self, message_id: &str) -> Result<Vec<Extraction>, ReverieError> {
        queries::extractions::get_extractions(self.db()?, message_id).await
    }

    async fn delete_extractions_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<usize, ReverieError> {
        queries::extractions::delete_for_conversation(self.db()?, conversation_id).await
    }

    async fn list_evidence(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<Evidence>, ReverieError> {
        queries::extractions::list_evidence(self.db()?, conversation_id).await
    }

    // --- Narrative ---

    async fn get_narrative(&self) -> Result<Option<NarrativeSummary>, ReverieError> {
        queries::narrative::get_narrative(self.db()?).await
    }

    async fn save_narrative(&self, narrative: &NarrativeSummary) -> Result<(), ReverieError> {
        queries::narrative::save_narrative(self.db()?, narrative).await
    }

    // --- Guided onboarding ---

    async fn get_onboarding_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<GuidedOnboardingState>, ReverieError> {
        queries::onboarding::get_state(self.db()?, conversation_id).await
    }

    async fn save_onboarding_state(
        &self,
        state: &GuidedOnboardingState,
    ) -> Result<(), ReverieError> {
        queries::onboarding::save_state(self.db()?, state).await
    }
}
