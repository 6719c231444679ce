// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete Reverie stack with mock adapters and a
//! temp SQLite database. Provides `send()` to drive the full turn pipeline
//! and `settle()` to wait for background extraction.

use std::sync::Arc;

use reverie_agent::{ProviderManager, Reverie, TurnOrchestrator, TurnReply};
use reverie_config::ReverieConfig;
use reverie_config::model::{BackendKind, JourneyConfig, ProviderConfig};
use reverie_core::{ProviderAdapter, ReverieError, StorageAdapter};
use reverie_storage::SqliteStorage;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Vector dimension used by the default mock embedder.
pub const TEST_DIMENSION: usize = 32;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    provider: Option<MockProvider>,
    responses: Vec<String>,
    embedder: Option<MockEmbedder>,
    config: ReverieConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            provider: None,
            responses: Vec::new(),
            embedder: None,
            config: ReverieConfig::default(),
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Use a preconfigured mock provider. Queued responses still apply.
    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_embedder(mut self, embedder: MockEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Register a journey in the static registry.
    pub fn with_journey(mut self, id: &str, system_prompt: &str) -> Self {
        self.config.journeys.push(JourneyConfig {
            id: id.to_string(),
            title: format!("Journey {id}"),
            description: String::new(),
            system_prompt: system_prompt.to_string(),
        });
        self
    }

    /// Turn off background extraction.
    pub fn without_memory(mut self) -> Self {
        self.config.memory.enabled = false;
        self
    }

    /// Adjust any other configuration value.
    pub fn configure(mut self, f: impl FnOnce(&mut ReverieConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ReverieError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ReverieError::Storage { source: e.into() })?;
        let mut config = self.config;
        config.storage.database_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned();
        config.provider = ProviderConfig::default();

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let provider = self.provider.unwrap_or_default();
        for response in self.responses {
            provider.add_response(response).await;
        }
        let provider = Arc::new(provider);
        let embedder = Arc::new(
            self.embedder
                .unwrap_or_else(|| MockEmbedder::new(TEST_DIMENSION)),
        );

        let mut manager = ProviderManager::new();
        for kind in [BackendKind::Ollama, BackendKind::Anthropic] {
            let provider = Arc::clone(&provider);
            manager.register(
                kind,
                Arc::new(move |_: &ProviderConfig| {
                    let provider: Arc<dyn ProviderAdapter> = provider.clone();
                    Ok(provider)
                }),
            );
        }
        let manager = Arc::new(manager);
        manager.initialize(config.provider.clone()).await?;

        let reverie = Reverie::assemble(config, Arc::clone(&storage), embedder.clone(), manager)?;

        Ok(TestHarness {
            provider,
            embedder,
            storage,
            reverie,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock LLM provider behind every backend.
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub reverie: Reverie,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn orchestrator(&self) -> &Arc<TurnOrchestrator> {
        self.reverie.orchestrator()
    }

    /// Send a blocking turn, into `conversation_id` or the latest conversation.
    pub async fn send(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<TurnReply, ReverieError> {
        self.orchestrator().send_turn(text, conversation_id).await
    }

    /// Waits for background extraction spawned so far.
    pub async fn settle(&self) {
        self.orchestrator().wait_for_background().await;
    }

    /// Add a response to the mock provider's queue.
    pub async fn add_provider_response(&self, text: impl Into<String>) {
        self.provider.add_response(text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_core::Role;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        let conversations = harness.storage.list_conversations().await.unwrap();
        assert!(conversations.is_empty());
    }

    #[tokio::test]
    async fn send_persists_user_and_assistant_messages() {
        let harness = TestHarness::builder()
            .with_mock_responses(vec!["stored response".to_string()])
            .without_memory()
            .build()
            .await
            .unwrap();

        let reply = harness.send("store me please", None).await.unwrap();
        assert_eq!(reply.response, "stored response");

        let messages = harness
            .storage
            .get_messages(&reply.conversation_id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "store me please");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "stored response");
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().without_memory().build().await.unwrap();
        let h2 = TestHarness::builder().without_memory().build().await.unwrap();

        h1.send("first message here", None).await.unwrap();
        assert_eq!(h1.storage.list_conversations().await.unwrap().len(), 1);
        assert_eq!(h2.storage.list_conversations().await.unwrap().len(), 0);
    }
}
