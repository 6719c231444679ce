// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity index trait for vector search over messages and insights.

use async_trait::async_trait;

use crate::error::ReverieError;
use crate::types::SimilarityRecord;

/// Collection holding user message embeddings.
pub const MESSAGES_COLLECTION: &str = "messages";

/// Collection holding narrative insight embeddings.
pub const INSIGHTS_COLLECTION: &str = "insights";

/// Nearest-neighbour search over fixed-dimension vectors, partitioned into
/// named collections.
#[async_trait]
pub trait SimilarityIndex: Send + Sync + 'static {
    /// Inserts or replaces the vector stored under `id`.
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
    ) -> Result<(), ReverieError>;

    /// Returns up to `limit` records ordered by descending similarity.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarityRecord>, ReverieError>;

    /// Removes the given ids. Unknown ids are ignored.
    async fn remove(&self, collection: &str, ids: &[String]) -> Result<(), ReverieError>;
}
