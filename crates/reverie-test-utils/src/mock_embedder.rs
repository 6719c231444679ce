// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter for tests.
//!
//! Words are hashed into buckets and the counts normalized, so texts that
//! share words score high cosine similarity and identical texts score 1.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reverie_core::{
    AdapterType, EmbedKind, EmbeddingAdapter, HealthStatus, PluginAdapter, ReverieError,
};

pub struct MockEmbedder {
    dimension: usize,
    ready: AtomicBool,
}

impl MockEmbedder {
    /// A ready embedder producing `dimension`-length vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ready: AtomicBool::new(true),
        }
    }

    /// An embedder that reports not ready until `initialize` is called.
    pub fn not_ready(dimension: usize) -> Self {
        Self {
            dimension,
            ready: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, ReverieError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReverieError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn initialize(&self) -> Result<(), ReverieError> {
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn embed(&self, text: &str, _kind: EmbedKind) -> Result<Vec<f32>, ReverieError> {
        if text.trim().is_empty() {
            return Err(ReverieError::EmptyInput);
        }

        let mut vector = vec![0.0_f32; self.dimension];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }
}
