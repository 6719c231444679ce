// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`] which handles request construction,
//! authentication and streaming SSE responses. Failed calls are returned to
//! the caller as typed errors; nothing is retried here.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use reverie_core::ReverieError;
use tracing::debug;

use crate::sse::{self, SseStream};
use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Base URL of the Anthropic API.
const API_BASE_URL: &str = "https://api.anthropic.com";

/// HTTP client for Anthropic API communication.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a new Anthropic API client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key for authentication
    /// * `api_version` - API version string (e.g., "2023-06-01")
    pub fn new(api_key: &str, api_version: &str) -> Result<Self, ReverieError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                ReverieError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                ReverieError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ReverieError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn post_messages(
        &self,
        request: &MessageRequest,
    ) -> Result<reqwest::Response, ReverieError> {
        let response = self
            .client
            .post(self.messages_url())
            .json(request)
            .send()
            .await
            .map_err(|e| ReverieError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, stream = request.stream, "messages response received");

        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Sends a streaming request and returns a stream of SSE events.
    pub async fn stream_message(
        &self,
        request: &MessageRequest,
    ) -> Result<SseStream, ReverieError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.post_messages(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ReverieError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.post_messages(&req).await?;
        let body = response.text().await.map_err(|e| ReverieError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| ReverieError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Issues the cheapest authenticated call (`GET /v1/models?limit=1`) and
    /// returns its status code.
    pub async fn probe(&self) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/v1/models?limit=1", self.base_url))
            .timeout(Duration::from_secs(15))
            .send()
            .await?;
        Ok(response.status())
    }
}

/// Builds [`ReverieError::Http`] from a non-2xx response, preferring the
/// structured Anthropic error body when present.
async fn error_from_response(response: reqwest::Response) -> ReverieError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) => format!("{}: {}", api_err.error.type_, api_err.error.message),
        Err(_) => body,
    };
    ReverieError::Http { status, body }
}
