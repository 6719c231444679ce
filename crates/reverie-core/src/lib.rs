// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Reverie journaling assistant.
//!
//! This crate provides the trait definitions, error types, and domain types
//! used throughout the Reverie workspace. Every backend adapter implements
//! traits defined here.

pub mod error;
pub mod onboarding;
pub mod traits;
pub mod types;

pub use error::ReverieError;
pub use onboarding::{DeactivationReason, GuidedOnboardingState};
pub use types::{
    AdapterType, ChatMessage, ConnectionStatus, Conversation, EmbedKind, Evidence, Extraction,
    ExtractionStatus, GenerateOptions, HealthStatus, Journey, Message, NarrativeSummary,
    ProfileTier, Role, SignalCategory, SimilarityRecord, StreamEvent,
};

pub use traits::{
    EmbeddingAdapter, JourneyRegistry, PluginAdapter, ProviderAdapter, SimilarityIndex,
    StorageAdapter, TextStream,
};
