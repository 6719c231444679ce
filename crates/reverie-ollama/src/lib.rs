// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama adapters for Reverie.
//!
//! [`OllamaProvider`] generates chat responses from a locally served model,
//! streaming over newline-delimited JSON. [`OllamaEmbedder`] produces the
//! vectors used for similarity retrieval.

pub mod client;
pub mod embedder;
pub mod ndjson;
pub mod types;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reverie_config::model::OllamaConfig;
use reverie_core::{
    AdapterType, ChatMessage, ConnectionStatus, GenerateOptions, HealthStatus, PluginAdapter,
    ProviderAdapter, ReverieError, StreamEvent, TextStream,
};
use tracing::{debug, info};

pub use client::OllamaClient;
pub use embedder::OllamaEmbedder;

use crate::types::{ChatChunk, ChatOptions, ChatRequest, OllamaMessage};

/// Local chat provider implementing [`ProviderAdapter`].
pub struct OllamaProvider {
    client: OllamaClient,
    model: String,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self, ReverieError> {
        let client = OllamaClient::new(&config.endpoint)?;
        info!(
            endpoint = client.base_url(),
            model = config.model,
            "Ollama provider initialized"
        );
        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    fn to_chat_request(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
        stream: bool,
    ) -> ChatRequest {
        let system = system_prompt.map(|prompt| OllamaMessage {
            role: "system".into(),
            content: prompt.to_string(),
        });
        let messages = system
            .into_iter()
            .chain(messages.iter().map(|m| OllamaMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            }))
            .collect();

        ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            options: ChatOptions {
                num_predict: Some(options.max_tokens),
                temperature: options.temperature,
            },
        }
    }
}

#[async_trait]
impl PluginAdapter for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ReverieError> {
        let status = self.test_connection().await;
        Ok(match status.error {
            None => HealthStatus::Healthy,
            Some(reason) => HealthStatus::Unhealthy(reason),
        })
    }

    async fn shutdown(&self) -> Result<(), ReverieError> {
        debug!("Ollama provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OllamaProvider {
    fn is_configured(&self) -> bool {
        !self.client.base_url().trim().is_empty() && !self.model.trim().is_empty()
    }

    async fn test_connection(&self) -> ConnectionStatus {
        match self.client.tags().await {
            Ok((code, _)) if !(200..300).contains(&code) => {
                ConnectionStatus::failed(format!("Ollama returned HTTP {code}"))
            }
            Ok((_, Some(tags))) if !has_model(&tags.models, &self.model) => {
                ConnectionStatus::failed(format!(
                    "model `{}` is not installed; run `ollama pull {}`",
                    self.model, self.model
                ))
            }
            Ok(_) => ConnectionStatus::ok(),
            Err(e) => ConnectionStatus::failed(format!(
                "Ollama unreachable at {}: {e}",
                self.client.base_url()
            )),
        }
    }

    async fn generate_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String, ReverieError> {
        let request = self.to_chat_request(messages, system_prompt, options, false);
        let response = self.client.chat(&request).await?;
        if let Some(error) = response.error {
            return Err(ReverieError::provider(format!("Ollama error: {error}")));
        }
        Ok(response.message.map(|m| m.content).unwrap_or_default())
    }

    async fn stream_text(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<TextStream, ReverieError> {
        let request = self.to_chat_request(messages, system_prompt, options, true);
        let chunks = self.client.chat_stream(&request).await?;

        let mut thinking_announced = false;
        let events = chunks.flat_map(move |result| {
            let events = match result {
                Ok(chunk) => map_chat_chunk(chunk, &mut thinking_announced),
                Err(e) => vec![Err(e)],
            };
            stream::iter(events)
        });

        Ok(Box::pin(events))
    }
}

/// Maps one streamed chunk to zero or more stream events. `ThinkingStarted`
/// is emitted at most once per stream.
fn map_chat_chunk(
    chunk: ChatChunk,
    thinking_announced: &mut bool,
) -> Vec<Result<StreamEvent, ReverieError>> {
    if let Some(error) = chunk.error {
        return vec![Err(ReverieError::provider(format!("Ollama stream error: {error}")))];
    }

    let mut events = Vec::new();
    if let Some(message) = chunk.message {
        let thinking = message.thinking.as_deref().is_some_and(|t| !t.is_empty());
        if thinking && !*thinking_announced {
            *thinking_announced = true;
            events.push(Ok(StreamEvent::ThinkingStarted));
        }
        if !message.content.is_empty() {
            events.push(Ok(StreamEvent::TextChunk(message.content)));
        }
    }
    if chunk.done {
        debug!("Ollama stream done");
    }
    events
}

/// Ollama reports untagged pulls as `name:latest`.
fn has_model(models: &[types::ModelTag], wanted: &str) -> bool {
    models.iter().any(|m| {
        m.name == wanted || (!wanted.contains(':') && m.name == format!("{wanted}:latest"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(&OllamaConfig {
            endpoint: server.uri(),
            model: "llama3.1:8b".into(),
        })
        .unwrap()
    }

    fn ndjson_response(lines: &[serde_json::Value]) -> ResponseTemplate {
        let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/x-ndjson")
            .set_body_string(body)
    }

    #[test]
    fn system_prompt_goes_first() {
        let provider = OllamaProvider::new(&OllamaConfig::default()).unwrap();
        let options = GenerateOptions {
            max_tokens: 256,
            temperature: Some(0.7),
        };
        let req = provider.to_chat_request(
            &[ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            Some("be gentle"),
            &options,
            false,
        );
        let roles: Vec<&str> = req.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(req.options.num_predict, Some(256));
        assert_eq!(req.options.temperature, Some(0.7));
    }

    #[test]
    fn is_configured_requires_model() {
        let provider = OllamaProvider::new(&OllamaConfig {
            model: " ".into(),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert!(!provider.is_configured());
        assert!(OllamaProvider::new(&OllamaConfig::default()).unwrap().is_configured());
    }

    #[test]
    fn latest_tag_matches_untagged_model() {
        let models = vec![types::ModelTag {
            name: "mistral:latest".into(),
        }];
        assert!(has_model(&models, "mistral"));
        assert!(!has_model(&models, "mistral:7b"));
    }

    #[tokio::test]
    async fn generate_text_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"stream": false, "model": "llama3.1:8b"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.1:8b",
                "message": {"role": "assistant", "content": "That sounds heavy."},
                "done": true
            })))
            .mount(&server)
            .await;

        let text = provider_for(&server)
            .generate_text(&[ChatMessage::user("long week")], None, &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "That sounds heavy.");
    }

    #[tokio::test]
    async fn generate_text_without_content_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": true})),
            )
            .mount(&server)
            .await;

        let text = provider_for(&server)
            .generate_text(&[ChatMessage::user("hi")], None, &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn stream_announces_thinking_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(ndjson_response(&[
                serde_json::json!({"message": {"role": "assistant", "content": "", "thinking": "Let me"}, "done": false}),
                serde_json::json!({"message": {"role": "assistant", "content": "", "thinking": " think"}, "done": false}),
                serde_json::json!({"message": {"role": "assistant", "content": "I hear"}, "done": false}),
                serde_json::json!({"message": {"role": "assistant", "content": " you."}, "done": false}),
                serde_json::json!({"message": {"role": "assistant", "content": ""}, "done": true}),
            ]))
            .mount(&server)
            .await;

        let stream = provider_for(&server)
            .stream_text(&[ChatMessage::user("hi")], Some("sys"), &GenerateOptions::default())
            .await
            .unwrap();
        let events: Vec<StreamEvent> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::ThinkingStarted,
                StreamEvent::TextChunk("I hear".into()),
                StreamEvent::TextChunk(" you.".into()),
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_line_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ndjson_response(&[
                serde_json::json!({"message": {"role": "assistant", "content": "Hel"}, "done": false}),
                serde_json::json!({"error": "model runner crashed"}),
            ]))
            .mount(&server)
            .await;

        let mut stream = provider_for(&server)
            .stream_text(&[ChatMessage::user("hi")], None, &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            StreamEvent::TextChunk("Hel".into())
        );
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("model runner crashed"));
    }

    #[tokio::test]
    async fn stream_http_error_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model not found"})),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .stream_text(&[ChatMessage::user("hi")], None, &GenerateOptions::default())
            .await
            .err()
            .expect("stream should fail to start");
        assert!(matches!(err, ReverieError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_connection_checks_installed_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3.1:8b"}, {"name": "nomic-embed-text:latest"}]
            })))
            .mount(&server)
            .await;

        assert!(provider_for(&server).test_connection().await.ok);

        let other = OllamaProvider::new(&OllamaConfig {
            endpoint: server.uri(),
            model: "qwen3:14b".into(),
        })
        .unwrap();
        let status = other.test_connection().await;
        assert!(!status.ok);
        assert!(status.error.unwrap().contains("ollama pull qwen3:14b"));
    }

    #[tokio::test]
    async fn test_connection_reports_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let status = provider_for(&server).test_connection().await;
        assert!(!status.ok);
        assert_eq!(status.error.as_deref(), Some("Ollama returned HTTP 503"));
    }

    #[tokio::test]
    async fn test_connection_reports_unreachable() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        drop(server);

        let status = provider.test_connection().await;
        assert!(!status.ok);
        assert!(status.error.unwrap().contains("unreachable"));
    }
}
