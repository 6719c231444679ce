// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the Reverie journaling assistant.
//!
//! ## Architecture
//!
//! - **SqliteSimilarityIndex**: cosine search over vectors stored on the shared connection
//! - **schema**: the structured signal payload and its validation rules
//! - **Profile**: computed view over evidence rows, grouped by tier
//! - **narrative**: periodic narrative synthesis
//! - **ExtractionPipeline**: background extraction, narrative refresh,
//!   onboarding checks and conversation re-analysis

pub mod index;
pub mod narrative;
pub mod pipeline;
pub mod profile;
pub mod schema;

pub use index::SqliteSimilarityIndex;
pub use pipeline::{
    ExtractionOutcome, ExtractionPipeline, ReanalysisProgress, ReanalysisReport, ReanalysisStatus,
};
pub use profile::{Profile, ProfileSignal};

/// Current UTC time as an RFC 3339 string with millisecond precision.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
