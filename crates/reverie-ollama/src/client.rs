// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin HTTP client for the Ollama REST API.

use std::time::Duration;

use reverie_core::ReverieError;
use tracing::debug;

use crate::ndjson::{self, NdjsonStream};
use crate::types::{
    ChatChunk, ChatRequest, EmbedRequest, EmbedResponse, OllamaError, TagsResponse,
};

/// HTTP client bound to one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Creates a client for the server at `endpoint` (e.g. `http://localhost:11434`).
    pub fn new(endpoint: &str) -> Result<Self, ReverieError> {
        // Local models can take minutes to load on first use.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| ReverieError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ReverieError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| ReverieError::Provider {
                message: format!("Ollama request to {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, path, "Ollama response received");

        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// `POST /api/chat` with `stream: false`.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatChunk, ReverieError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.post("/api/chat", &req).await?;
        read_json(response).await
    }

    /// `POST /api/chat` with `stream: true`, yielding one chunk per NDJSON line.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<NdjsonStream<ChatChunk>, ReverieError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.post("/api/chat", &req).await?;
        Ok(ndjson::parse_ndjson_stream(response))
    }

    /// `POST /api/embed` for a single input.
    pub async fn embed(&self, model: &str, input: String) -> Result<EmbedResponse, ReverieError> {
        let response = self.post("/api/embed", &EmbedRequest { model, input }).await?;
        read_json(response).await
    }

    /// `GET /api/tags`. Returns the HTTP status and, on success, the installed models.
    pub async fn tags(&self) -> Result<(u16, Option<TagsResponse>), reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(15))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Ok((status.as_u16(), None));
        }
        let tags = response.json::<TagsResponse>().await.ok();
        Ok((status.as_u16(), tags))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ReverieError> {
    let body = response.text().await.map_err(|e| ReverieError::Provider {
        message: format!("failed to read Ollama response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| ReverieError::Provider {
        message: format!("failed to parse Ollama response: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Converts a non-2xx response into [`ReverieError::Http`], unwrapping
/// Ollama's `{"error": "..."}` body when present.
async fn error_from_response(response: reqwest::Response) -> ReverieError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<OllamaError>(&body) {
        Ok(err) => err.error,
        Err(_) => body,
    };
    ReverieError::Http { status, body }
}
