// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter backed by Ollama's `/api/embed` endpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reverie_config::model::MemoryConfig;
use reverie_core::{
    AdapterType, EmbedKind, EmbeddingAdapter, HealthStatus, PluginAdapter, ReverieError,
};
use tracing::{debug, info, warn};

use crate::client::OllamaClient;

/// Produces fixed-dimension vectors from a locally served embedding model.
///
/// The adapter is not ready until [`initialize`](EmbeddingAdapter::initialize)
/// has completed a probe embedding with the configured dimension.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dimension: usize,
    ready: AtomicBool,
}

impl OllamaEmbedder {
    pub fn new(config: &MemoryConfig) -> Result<Self, ReverieError> {
        Ok(Self {
            client: OllamaClient::new(&config.embedding_endpoint)?,
            model: config.embedding_model.clone(),
            dimension: config.dimension,
            ready: AtomicBool::new(false),
        })
    }

    /// Nomic models are trained with task prefixes that separate queries
    /// from stored documents.
    fn prepare_input(&self, text: &str, kind: EmbedKind) -> String {
        if self.model.contains("nomic") {
            format!("search_{kind}: {text}")
        } else {
            text.to_string()
        }
    }
}

#[async_trait]
impl PluginAdapter for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama-embed"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, ReverieError> {
        if self.is_ready() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("embedding model not initialized".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), ReverieError> {
        self.ready.store(false, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OllamaEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn initialize(&self) -> Result<(), ReverieError> {
        match self.embed("ready", EmbedKind::Document).await {
            Ok(_) => {
                self.ready.store(true, Ordering::Release);
                info!(
                    model = self.model,
                    dimension = self.dimension,
                    "embedding model ready"
                );
                Ok(())
            }
            Err(e) => {
                warn!(model = self.model, error = %e, "embedding model failed to initialize");
                Err(e)
            }
        }
    }

    async fn embed(&self, text: &str, kind: EmbedKind) -> Result<Vec<f32>, ReverieError> {
        if text.trim().is_empty() {
            return Err(ReverieError::EmptyInput);
        }

        let response = self
            .client
            .embed(&self.model, self.prepare_input(text, kind))
            .await?;
        let vector = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ReverieError::provider("embedding response contained no vectors"))?;

        if vector.len() != self.dimension {
            return Err(ReverieError::Validation(format!(
                "embedding model `{}` returned {} dimensions, expected {}",
                self.model,
                vector.len(),
                self.dimension
            )));
        }

        debug!(%kind, chars = text.len(), "text embedded");
        Ok(vector)
    }
}
