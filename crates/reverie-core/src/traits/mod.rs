// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Backends extend the [`PluginAdapter`] base trait and use `#[async_trait]`
//! so they can be held as `Arc<dyn Trait>` and swapped at runtime.

pub mod adapter;
pub mod embedding;
pub mod journey;
pub mod provider;
pub mod similarity;
pub mod storage;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use journey::JourneyRegistry;
pub use provider::{ProviderAdapter, TextStream};
pub use similarity::SimilarityIndex;
pub use storage::StorageAdapter;
