// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider adapter for Reverie.
//!
//! Implements [`ProviderAdapter`] for the Anthropic Messages API with both
//! single-shot completion and streaming SSE responses, including the
//! extended-thinking signal.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures::stream::StreamExt;
use reverie_config::model::AnthropicConfig;
use reverie_core::{
    AdapterType, ChatMessage, ConnectionStatus, GenerateOptions, HealthStatus, PluginAdapter,
    ProviderAdapter, ReverieError, StreamEvent, TextStream,
};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::sse::SseEvent;
use crate::types::{ApiMessage, MessageRequest, SseDelta, ThinkingConfig};

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `ANTHROPIC_API_KEY` env var -> error.
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
    thinking_budget_tokens: Option<u32>,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider from the given configuration.
    ///
    /// Fails with a configuration error when no API key can be resolved.
    pub fn new(config: &AnthropicConfig) -> Result<Self, ReverieError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = AnthropicClient::new(&api_key, &config.api_version)?;

        info!(
            model = config.model,
            thinking = config.thinking_budget_tokens.is_some(),
            "Anthropic provider initialized"
        );

        Ok(Self::with_client(client, config))
    }

    fn with_client(client: AnthropicClient, config: &AnthropicConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            thinking_budget_tokens: config.thinking_budget_tokens,
        }
    }

    /// Builds the wire request. With extended thinking enabled the budget is
    /// added on top of `max_tokens` and the temperature is dropped, since the
    /// API rejects custom temperatures alongside thinking.
    fn to_message_request(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
        stream: bool,
    ) -> MessageRequest {
        let messages = messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        let (max_tokens, temperature, thinking) = match self.thinking_budget_tokens {
            Some(budget) => (
                options.max_tokens.saturating_add(budget),
                None,
                Some(ThinkingConfig::enabled(budget)),
            ),
            None => (options.max_tokens, options.temperature, None),
        };

        MessageRequest {
            model: self.model.clone(),
            messages,
            system: system_prompt.map(str::to_string),
            max_tokens,
            temperature,
            thinking,
            stream,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ReverieError> {
        // Avoid spending tokens: the client was built with a resolved key.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReverieError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn is_configured(&self) -> bool {
        !self.model.trim().is_empty()
    }

    async fn test_connection(&self) -> ConnectionStatus {
        match self.client.probe().await {
            Ok(status) if status.is_success() => ConnectionStatus::ok(),
            Ok(status) => match status.as_u16() {
                401 | 403 => ConnectionStatus::failed("invalid API key"),
                429 | 529 => ConnectionStatus::ok(),
                code => ConnectionStatus::failed(format!("Anthropic API returned HTTP {code}")),
            },
            Err(e) => ConnectionStatus::failed(format!("Anthropic API unreachable: {e}")),
        }
    }

    async fn generate_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String, ReverieError> {
        let request = self.to_message_request(messages, system_prompt, options, false);
        let response = self.client.complete_message(&request).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "completion finished"
        );
        Ok(response.text())
    }

    async fn stream_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<TextStream, ReverieError> {
        let request = self.to_message_request(messages, system_prompt, options, true);
        let event_stream = self.client.stream_message(&request).await?;

        let mut thinking_announced = false;
        let text_stream = event_stream.filter_map(move |result| {
            let event = match result {
                Ok(event) => map_sse_event(event, &mut thinking_announced),
                Err(e) => Some(Err(e)),
            };
            async move { event }
        });

        Ok(Box::pin(text_stream))
    }
}

/// Maps one SSE event to a provider stream event. `ThinkingStarted` is
/// emitted at most once per stream.
fn map_sse_event(
    event: SseEvent,
    thinking_announced: &mut bool,
) -> Option<Result<StreamEvent, ReverieError>> {
    match event {
        SseEvent::ContentBlockStart(start) if start.content_block.is_thinking() => {
            if *thinking_announced {
                None
            } else {
                *thinking_announced = true;
                Some(Ok(StreamEvent::ThinkingStarted))
            }
        }
        SseEvent::ContentBlockDelta(delta) => match delta.delta {
            SseDelta::TextDelta { text } if !text.is_empty() => {
                Some(Ok(StreamEvent::TextChunk(text)))
            }
            _ => None,
        },
        SseEvent::Error(err) => Some(Err(ReverieError::Provider {
            message: format!(
                "Anthropic stream error ({}): {}",
                err.error.type_, err.error.message
            ),
            source: None,
        })),
        SseEvent::MessageDelta(md) => {
            debug!(stop_reason = ?md.delta.stop_reason, "stream message delta");
            None
        }
        _ => None,
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, ReverieError> {
    if let Some(key) = config_key
        && !key.trim().is_empty()
    {
        return Ok(key.clone());
    }

    match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ReverieError::Config(
            "Anthropic API key not found. Set provider.anthropic.api_key in config or the ANTHROPIC_API_KEY environment variable.".into(),
        )),
    }
}
