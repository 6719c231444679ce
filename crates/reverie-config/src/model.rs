// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Reverie.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Reverie configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReverieConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Generation backend selection and settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Context assembly settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Embedding, extraction and narrative settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Scripted journeys available to start from the front end.
    #[serde(default)]
    pub journeys: Vec<JourneyConfig>,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant, used in the standard system prompt.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Replaces the opening persona paragraph of the standard system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_agent_name() -> String {
    "Reverie".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which generation backend is live.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local model served by Ollama.
    #[default]
    Ollama,
    /// Hosted Anthropic Messages API.
    Anthropic,
}

/// Generation backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Active backend.
    #[serde(default)]
    pub backend: BackendKind,

    /// Maximum tokens generated per chat response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for chat responses.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Hosted backend settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Local backend settings.
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            max_tokens: default_max_tokens(),
            temperature: None,
            anthropic: AnthropicConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

fn default_max_tokens() -> u32 {
    1024
}

/// Anthropic API configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// Anthropic API version header value.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Enables extended thinking with this token budget.
    #[serde(default)]
    pub thinking_budget_tokens: Option<u32>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_anthropic_model(),
            api_version: default_api_version(),
            thinking_budget_tokens: None,
        }
    }
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Ollama configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Chat model name.
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
        }
    }
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("reverie").join("reverie.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("reverie.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Context assembly configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Number of preceding messages included in the user prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Maximum retrieved records per collection.
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,

    /// Minimum cosine similarity for a retrieved record (0.0-1.0).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            retrieval_limit: default_retrieval_limit(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_history_window() -> usize {
    10
}

fn default_retrieval_limit() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.35
}

/// Memory system configuration.
///
/// Controls embeddings, background extraction, and narrative synthesis.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable background extraction. When false, turns never spawn extraction tasks.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Base URL of the embedding service (Ollama-compatible `/api/embed`).
    #[serde(default = "default_ollama_endpoint")]
    pub embedding_endpoint: String,

    /// Name of the embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Fixed vector dimension produced by the embedding model.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Regenerate the narrative summary every this many user messages.
    #[serde(default = "default_narrative_interval")]
    pub narrative_interval: u32,

    /// Token budget for extraction and narrative calls.
    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            embedding_endpoint: default_ollama_endpoint(),
            embedding_model: default_embedding_model(),
            dimension: default_dimension(),
            narrative_interval: default_narrative_interval(),
            extraction_max_tokens: default_extraction_max_tokens(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimension() -> usize {
    768
}

fn default_narrative_interval() -> u32 {
    10
}

fn default_extraction_max_tokens() -> u32 {
    2048
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the HTTP/WebSocket gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Address to bind to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3917
}

/// A scripted journey entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JourneyConfig {
    /// Stable identifier referenced by conversations.
    pub id: String,

    /// Title shown to the user.
    pub title: String,

    /// Short description shown before starting.
    #[serde(default)]
    pub description: String,

    /// Fixed system prompt used for every turn of the journey.
    pub system_prompt: String,
}
