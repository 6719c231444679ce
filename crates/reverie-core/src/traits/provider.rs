// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for text generation backends (Ollama, Anthropic).

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ReverieError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, ConnectionStatus, GenerateOptions, StreamEvent};

/// A lazily produced sequence of stream events.
///
/// Dropping the stream before it is exhausted cancels the underlying request.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ReverieError>> + Send>>;

/// Uniform capability interface implemented by every generation backend.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// True when the adapter has enough configuration to attempt a call.
    ///
    /// Must not perform network I/O.
    fn is_configured(&self) -> bool;

    /// Performs a minimal round-trip against the backend.
    ///
    /// Rate-limited or transiently failing backends still report `ok`, since
    /// the response proves the endpoint and credential are valid.
    async fn test_connection(&self) -> ConnectionStatus;

    /// Generates a complete response. Returns an empty string when the model
    /// emits no text.
    async fn generate_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String, ReverieError>;

    /// Starts a streaming generation.
    async fn stream_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<TextStream, ReverieError>;
}
