// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Reverie journaling assistant.

use thiserror::Error;

/// The primary error type used across all Reverie adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ReverieError {
    /// Configuration errors (missing credential, unregistered backend, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM provider errors (transport failure, malformed response, stream error).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Requested adapter or factory was not found in the registry.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// A component was used before it was initialized.
    #[error("{0} is not initialized")]
    NotInitialized(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input text was empty or whitespace only.
    #[error("input must not be empty")]
    EmptyInput,

    /// The backend finished without producing any usable text.
    #[error("the model did not produce a response; try again or increase the token budget")]
    EmptyGeneration,

    /// A payload failed schema or semantic validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReverieError {
    /// Shorthand for a [`ReverieError::NotFound`] error.
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// Shorthand for a [`ReverieError::Provider`] error without a source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the error came from bad or missing configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::AdapterNotFound { .. })
    }
}
