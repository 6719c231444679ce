// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn pipeline and runtime wiring for the Reverie journaling assistant.
//!
//! [`Reverie`] is the central coordinator that:
//! - Opens storage and the similarity index on the shared connection
//! - Owns the [`ProviderManager`] with the built-in backends registered
//! - Builds the context assembler, extraction pipeline and journey registry
//! - Exposes the [`TurnOrchestrator`] used by every transport
//! - Drains background extraction on shutdown

pub mod journeys;
pub mod manager;
pub mod orchestrator;
pub mod shutdown;
pub mod title;

use std::sync::Arc;
use std::time::Duration;

use reverie_config::ReverieConfig;
use reverie_context::ContextAssembler;
use reverie_core::{
    EmbeddingAdapter, JourneyRegistry, PluginAdapter, ReverieError, SimilarityIndex,
    StorageAdapter,
};
use reverie_memory::{ExtractionPipeline, SqliteSimilarityIndex};
use reverie_ollama::OllamaEmbedder;
use reverie_storage::SqliteStorage;
use tracing::{info, warn};

pub use journeys::StaticJourneyRegistry;
pub use manager::{ProviderConfigUpdate, ProviderFactory, ProviderManager};
pub use orchestrator::{
    ConversationDetail, ProfileView, TurnEvent, TurnOrchestrator, TurnReply, TurnStage,
};

/// A fully wired Reverie instance.
pub struct Reverie {
    config: ReverieConfig,
    storage: Arc<SqliteStorage>,
    embedder: Arc<dyn EmbeddingAdapter>,
    manager: Arc<ProviderManager>,
    journeys: Arc<StaticJourneyRegistry>,
    orchestrator: Arc<TurnOrchestrator>,
}

impl Reverie {
    /// Opens storage and wires every component from configuration.
    ///
    /// A provider that fails to initialize is logged, not fatal: it can be
    /// fixed later through [`ProviderManager::update_config`]. The embedding
    /// service warms up in the background.
    pub async fn build(config: ReverieConfig) -> Result<Self, ReverieError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(OllamaEmbedder::new(&config.memory)?);

        let manager = Arc::new(ProviderManager::with_builtin_backends());
        if let Err(e) = manager.initialize(config.provider.clone()).await {
            warn!(
                backend = %config.provider.backend,
                error = %e,
                "provider not initialized, reconfigure it before chatting"
            );
        }

        let reverie = Self::assemble(config, storage, embedder, manager)?;
        reverie.warm_up_embedder();
        Ok(reverie)
    }

    /// Wires the remaining components around already constructed adapters.
    /// `storage` must be initialized.
    pub fn assemble(
        config: ReverieConfig,
        storage: Arc<SqliteStorage>,
        embedder: Arc<dyn EmbeddingAdapter>,
        manager: Arc<ProviderManager>,
    ) -> Result<Self, ReverieError> {
        let db = storage.database()?.clone();
        let index: Arc<dyn SimilarityIndex> =
            Arc::new(SqliteSimilarityIndex::new(db, embedder.dimension()));
        let journeys = Arc::new(StaticJourneyRegistry::from_config(&config.journeys));
        let storage_dyn: Arc<dyn StorageAdapter> = storage.clone();
        let journeys_dyn: Arc<dyn JourneyRegistry> = journeys.clone();

        let assembler = Arc::new(ContextAssembler::new(
            &config.agent,
            &config.context,
            Arc::clone(&storage_dyn),
            Arc::clone(&embedder),
            Arc::clone(&index),
            Arc::clone(&journeys_dyn),
        ));

        let pipeline = config.memory.enabled.then(|| {
            Arc::new(ExtractionPipeline::new(
                Arc::clone(&storage_dyn),
                Arc::clone(&embedder),
                Arc::clone(&index),
                config.memory.clone(),
            ))
        });
        if pipeline.is_none() {
            info!("memory disabled, turns will not be analysed");
        }

        let orchestrator = Arc::new(TurnOrchestrator::new(
            storage_dyn,
            Arc::clone(&manager),
            assembler,
            pipeline,
            index,
            journeys_dyn,
        ));

        info!(
            agent_name = config.agent.name.as_str(),
            journeys = config.journeys.len(),
            "reverie initialized"
        );

        Ok(Self {
            config,
            storage,
            embedder,
            manager,
            journeys,
            orchestrator,
        })
    }

    fn warm_up_embedder(&self) {
        let embedder = Arc::clone(&self.embedder);
        tokio::spawn(async move {
            match embedder.initialize().await {
                Ok(()) => info!(embedder = embedder.name(), "embedding service ready"),
                Err(e) => warn!(
                    embedder = embedder.name(),
                    error = %e,
                    "embedding service unavailable, retrieval and indexing disabled"
                ),
            }
        });
    }

    pub fn config(&self) -> &ReverieConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<TurnOrchestrator> {
        &self.orchestrator
    }

    pub fn manager(&self) -> &Arc<ProviderManager> {
        &self.manager
    }

    pub fn journeys(&self) -> &Arc<StaticJourneyRegistry> {
        &self.journeys
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingAdapter> {
        &self.embedder
    }

    pub fn storage(&self) -> &Arc<SqliteStorage> {
        &self.storage
    }

    /// Drains background work, then releases adapters.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ReverieError> {
        shutdown::drain_background(self.orchestrator.tracker(), timeout).await;

        if let Ok(provider) = self.manager.get_provider()
            && let Err(e) = provider.shutdown().await
        {
            warn!(error = %e, "provider shutdown failed");
        }
        if let Err(e) = self.embedder.shutdown().await {
            warn!(error = %e, "embedder shutdown failed");
        }
        self.storage.close().await?;
        info!("reverie shut down");
        Ok(())
    }
}
