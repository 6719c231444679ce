// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Reverie crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Embedding,
    SimilarityIndex,
}

/// Author of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// --- Provider types ---

/// A single message handed to a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call generation options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature. `None` leaves the backend default in place.
    pub temperature: Option<f32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: None,
        }
    }
}

/// An event produced by a streaming generation call.
///
/// `ThinkingStarted` carries no content and is never part of the response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of the final answer text.
    TextChunk(String),
    /// The backend entered a reasoning phase distinct from the final answer.
    ThinkingStarted,
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

// --- Embedding and similarity types ---

/// Whether text is embedded as a search query or as a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum EmbedKind {
    Query,
    Document,
}

/// A ranked hit returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityRecord {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

// --- Conversation types ---

/// A conversation, which owns an ordered sequence of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    /// Set when the conversation was started from a scripted journey.
    pub journey_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Exact prompt sent to the provider when this message was generated.
    pub prompt: Option<String>,
    pub created_at: String,
}

/// Lifecycle of an extraction record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Pending,
    Validated,
    Rejected,
}

/// The structured signal payload derived from one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub id: String,
    pub message_id: String,
    pub conversation_id: String,
    /// Raw payload as returned by the model, if any was received.
    pub payload: Option<String>,
    pub status: ExtractionStatus,
    /// Why the payload was rejected.
    pub error: Option<String>,
    pub created_at: String,
}

/// Profile tiers, in the order they are typically filled in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProfileTier {
    Essential,
    EarlyInference,
    Personality,
    DeeperPatterns,
}

/// Category of a single psychological signal instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Quote,
    Value,
    Challenge,
    Goal,
    NeedState,
    LifeSituation,
    ImmediateIntent,
    EmotionalTone,
    MoralFoundation,
    SupportStyle,
    RiskTolerance,
    MotivationStyle,
    LocusOfControl,
    TemporalOrientation,
    GrowthMindset,
    PersonalityTrait,
    AttachmentStyle,
    ChangeReadiness,
    StressResponse,
    EmotionalRegulation,
    SelfEfficacy,
}

impl SignalCategory {
    /// The profile tier this category contributes to.
    pub fn tier(self) -> ProfileTier {
        use SignalCategory::*;
        match self {
            Quote | Value | Challenge | Goal | NeedState | LifeSituation | ImmediateIntent
            | EmotionalTone => ProfileTier::Essential,
            MoralFoundation | SupportStyle | RiskTolerance | MotivationStyle | LocusOfControl
            | TemporalOrientation | GrowthMindset => ProfileTier::EarlyInference,
            PersonalityTrait | AttachmentStyle => ProfileTier::Personality,
            ChangeReadiness | StressResponse | EmotionalRegulation | SelfEfficacy => {
                ProfileTier::DeeperPatterns
            }
        }
    }
}

/// One durable signal instance backing the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub extraction_id: String,
    pub message_id: String,
    pub conversation_id: String,
    pub category: SignalCategory,
    pub label: String,
    pub detail: Option<String>,
    pub confidence: f64,
    /// Verbatim excerpt of the source message supporting this signal.
    pub quote: String,
    pub created_at: String,
}

/// Periodically regenerated synthesis of the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSummary {
    pub identity_summary: String,
    pub current_phase: String,
    pub emotional_baseline: String,
    #[serde(default)]
    pub primary_concerns: Vec<String>,
    #[serde(default)]
    pub patterns_to_watch: Vec<String>,
    #[serde(default)]
    pub recent_wins: Vec<String>,
    #[serde(default)]
    pub recent_struggles: Vec<String>,
    /// Total user messages at the time of generation.
    #[serde(default)]
    pub message_count: i64,
    #[serde(default)]
    pub updated_at: String,
}

/// A scripted onboarding flow with a fixed system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    pub id: String,
    pub title: String,
    pub description: String,
    pub system_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert!(Role::from_str("system").is_err());
    }

    #[test]
    fn signal_categories_map_to_tiers() {
        assert_eq!(SignalCategory::Value.tier(), ProfileTier::Essential);
        assert_eq!(SignalCategory::SupportStyle.tier(), ProfileTier::EarlyInference);
        assert_eq!(SignalCategory::PersonalityTrait.tier(), ProfileTier::Personality);
        assert_eq!(SignalCategory::SelfEfficacy.tier(), ProfileTier::DeeperPatterns);
    }

    #[test]
    fn signal_category_uses_snake_case() {
        assert_eq!(SignalCategory::NeedState.to_string(), "need_state");
        assert_eq!(
            SignalCategory::from_str("emotional_regulation").unwrap(),
            SignalCategory::EmotionalRegulation
        );
        let json = serde_json::to_string(&SignalCategory::LocusOfControl).unwrap();
        assert_eq!(json, "\"locus_of_control\"");
    }

    #[test]
    fn connection_status_constructors() {
        assert!(ConnectionStatus::ok().ok);
        let failed = ConnectionStatus::failed("unreachable");
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("unreachable"));
    }
}
