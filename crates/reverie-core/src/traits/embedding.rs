// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::ReverieError;
use crate::traits::adapter::PluginAdapter;
use crate::types::EmbedKind;

/// Adapter for turning text into fixed-length vectors.
///
/// Initialization is decoupled from first use: callers check [`is_ready`]
/// and skip embedding work while the service is still warming up.
///
/// [`is_ready`]: EmbeddingAdapter::is_ready
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Length of every vector this adapter produces.
    fn dimension(&self) -> usize;

    /// True once [`initialize`](EmbeddingAdapter::initialize) has succeeded.
    fn is_ready(&self) -> bool;

    /// Prepares the embedding backend (model download, warm-up probe).
    async fn initialize(&self) -> Result<(), ReverieError>;

    /// Embeds a single text. Fails with [`ReverieError::EmptyInput`] for
    /// empty or whitespace-only input.
    async fn embed(&self, text: &str, kind: EmbedKind) -> Result<Vec<f32>, ReverieError>;
}
