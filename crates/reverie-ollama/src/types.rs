// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama HTTP API request/response types.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "ChatOptions::is_empty")]
    pub options: ChatOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Sampling options forwarded to the model runner.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatOptions {
    fn is_empty(&self) -> bool {
        self.num_predict.is_none() && self.temperature.is_none()
    }
}

/// One `/api/chat` response object: the whole reply when not streaming, or
/// one NDJSON line when streaming.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    /// Set when the server fails mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
    /// Reasoning text from thinking-capable models.
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

/// Request body for `POST /api/embed`.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: String,
}

/// Response of `POST /api/embed`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

/// Error body returned by Ollama on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_empty_options() {
        let req = ChatRequest {
            model: "llama3.1:8b".into(),
            messages: vec![],
            stream: false,
            options: ChatOptions::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("options").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn chat_chunk_with_thinking() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"qwen3","message":{"role":"assistant","content":"","thinking":"Hmm"},"done":false}"#,
        )
        .unwrap();
        let message = chunk.message.unwrap();
        assert_eq!(message.thinking.as_deref(), Some("Hmm"));
        assert!(message.content.is_empty());
        assert!(!chunk.done);
    }
}
