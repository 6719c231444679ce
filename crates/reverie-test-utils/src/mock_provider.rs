// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use reverie_core::{
    AdapterType, ChatMessage, ConnectionStatus, GenerateOptions, HealthStatus, PluginAdapter,
    ProviderAdapter, ReverieError, StreamEvent, TextStream,
};

/// Response used when neither the queue nor a handler supplies one.
pub const DEFAULT_RESPONSE: &str = "mock response";

/// One call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub options: GenerateOptions,
    pub streaming: bool,
}

impl RecordedRequest {
    /// Content of the last message, usually the assembled user prompt.
    pub fn last_content(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or("")
    }
}

enum Reply {
    Text(String),
    Fail(String),
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> String + Send + Sync>;

/// A mock LLM provider that returns pre-configured responses.
///
/// Queued responses are popped in FIFO order. When the queue is empty the
/// handler (if any) computes the response, otherwise [`DEFAULT_RESPONSE`]
/// is returned.
pub struct MockProvider {
    name: String,
    replies: Mutex<VecDeque<Reply>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<RecordedRequest>>,
    thinking: bool,
    chunk_delay: Option<Duration>,
    configured: bool,
    connection: ConnectionStatus,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self {
            name: "mock-provider".to_string(),
            replies: Mutex::new(VecDeque::new()),
            handler: None,
            requests: Mutex::new(Vec::new()),
            thinking: false,
            chunk_delay: None,
            configured: true,
            connection: ConnectionStatus::ok(),
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let provider = Self::new();
        Self {
            replies: Mutex::new(responses.into_iter().map(Reply::Text).collect()),
            ..provider
        }
    }

    /// Create a mock provider that computes every response from the request.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> String + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::new()
        }
    }

    /// Rename the adapter, e.g. to tell rebuilt instances apart.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Emit `ThinkingStarted` before the text of every stream.
    pub fn with_thinking(mut self) -> Self {
        self.thinking = true;
        self
    }

    /// Pause between streamed chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Result reported by `test_connection`.
    pub fn with_connection(mut self, status: ConnectionStatus) -> Self {
        self.connection = status;
        self
    }

    /// Value reported by `is_configured`.
    pub fn with_configured(mut self, configured: bool) -> Self {
        self.configured = configured;
        self
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Reply::Text(text.into()));
    }

    /// Queue a provider error.
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Reply::Fail(message.into()));
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    async fn respond(&self, request: RecordedRequest) -> Result<String, ReverieError> {
        let queued = self.replies.lock().await.pop_front();
        let reply = match queued {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(ReverieError::provider(message)),
            None => Ok(match &self.handler {
                Some(handler) => handler(&request),
                None => DEFAULT_RESPONSE.to_string(),
            }),
        };
        self.requests.lock().await.push(request);
        reply
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ReverieError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReverieError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn test_connection(&self) -> ConnectionStatus {
        self.connection.clone()
    }

    async fn generate_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String, ReverieError> {
        self.respond(RecordedRequest {
            messages: messages.to_vec(),
            system: system_prompt.map(str::to_string),
            options: *options,
            streaming: false,
        })
        .await
    }

    async fn stream_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<TextStream, ReverieError> {
        let text = self
            .respond(RecordedRequest {
                messages: messages.to_vec(),
                system: system_prompt.map(str::to_string),
                options: *options,
                streaming: true,
            })
            .await?;

        let mut events = Vec::new();
        if self.thinking {
            events.push(StreamEvent::ThinkingStarted);
        }
        events.extend(
            text.split_inclusive(' ')
                .map(|chunk| StreamEvent::TextChunk(chunk.to_string())),
        );

        let delay = self.chunk_delay;
        let stream = stream::iter(events).then(move |event| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(event)
        });
        Ok(Box::pin(stream))
    }
}
