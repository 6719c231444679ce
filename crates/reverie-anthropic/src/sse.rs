// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Anthropic Messages API streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`SseEvent`] variants
//! using the `eventsource-stream` crate for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use reverie_core::ReverieError;
use serde::de::DeserializeOwned;

use crate::types::{
    ApiErrorResponse, SseContentBlockDelta, SseContentBlockStart, SseContentBlockStop,
    SseMessageDelta, SseMessageStart,
};

/// Typed SSE events from the Anthropic streaming protocol.
#[derive(Debug, Clone)]
pub enum SseEvent {
    MessageStart(SseMessageStart),
    ContentBlockStart(SseContentBlockStart),
    ContentBlockDelta(SseContentBlockDelta),
    ContentBlockStop(SseContentBlockStop),
    MessageDelta(SseMessageDelta),
    MessageStop,
    Ping,
    /// API error reported mid-stream.
    Error(ApiErrorResponse),
}

pub type SseStream = Pin<Box<dyn Stream<Item = Result<SseEvent, ReverieError>> + Send>>;

fn parse<T: DeserializeOwned>(name: &str, data: &str) -> Result<T, ReverieError> {
    serde_json::from_str(data).map_err(|e| ReverieError::Provider {
        message: format!("failed to parse {name}: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parses a reqwest streaming response into a stream of typed [`SseEvent`]s.
///
/// Unknown event types are skipped per Anthropic's API versioning policy.
/// Dropping the returned stream drops the response and closes the connection.
pub fn parse_sse_stream(response: reqwest::Response) -> SseStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = event.data.as_str();
                let parsed = match event.event.as_str() {
                    "message_start" => parse(&event.event, data).map(SseEvent::MessageStart),
                    "content_block_start" => {
                        parse(&event.event, data).map(SseEvent::ContentBlockStart)
                    }
                    "content_block_delta" => {
                        parse(&event.event, data).map(SseEvent::ContentBlockDelta)
                    }
                    "content_block_stop" => {
                        parse(&event.event, data).map(SseEvent::ContentBlockStop)
                    }
                    "message_delta" => parse(&event.event, data).map(SseEvent::MessageDelta),
                    "message_stop" => Ok(SseEvent::MessageStop),
                    "ping" => Ok(SseEvent::Ping),
                    "error" => parse(&event.event, data).map(SseEvent::Error),
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(ReverieError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResponseContentBlock, SseDelta};

    /// Serves raw SSE text through wiremock to get a real reqwest::Response.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parse_text_delta() {
        let sse = "event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        match stream.next().await.unwrap().unwrap() {
            SseEvent::ContentBlockDelta(delta) => {
                assert_eq!(delta.index, 0);
                assert_eq!(delta.delta, SseDelta::TextDelta { text: "Hello".into() });
            }
            other => panic!("expected ContentBlockDelta, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parse_thinking_block_start() {
        let sse = "event: content_block_start\ndata: {\"index\":0,\"content_block\":{\"type\":\"thinking\",\"thinking\":\"\"}}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        match stream.next().await.unwrap().unwrap() {
            SseEvent::ContentBlockStart(start) => {
                assert!(start.content_block.is_thinking());
            }
            other => panic!("expected ContentBlockStart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parse_redacted_thinking_block_start() {
        let sse = "event: content_block_start\ndata: {\"index\":0,\"content_block\":{\"type\":\"redacted_thinking\",\"data\":\"abc\"}}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        match stream.next().await.unwrap().unwrap() {
            SseEvent::ContentBlockStart(start) => {
                assert!(matches!(
                    start.content_block,
                    ResponseContentBlock::RedactedThinking { .. }
                ));
            }
            other => panic!("expected ContentBlockStart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parse_message_stop_and_ping() {
        let sse = "event: ping\ndata: {}\n\nevent: message_stop\ndata: {}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        assert!(matches!(stream.next().await.unwrap().unwrap(), SseEvent::Ping));
        assert!(matches!(stream.next().await.unwrap().unwrap(), SseEvent::MessageStop));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn unknown_events_are_skipped() {
        let sse = "event: unknown_future_event\ndata: {\"foo\":\"bar\"}\n\nevent: message_stop\ndata: {}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        let event = stream.next().await.unwrap().unwrap();
        assert!(matches!(event, SseEvent::MessageStop));
    }

    #[tokio::test]
    async fn parse_message_delta_with_usage() {
        let sse = "event: message_delta\ndata: {\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":25}}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        match stream.next().await.unwrap().unwrap() {
            SseEvent::MessageDelta(md) => {
                assert_eq!(md.delta.stop_reason, Some("end_turn".into()));
                assert_eq!(md.usage.as_ref().unwrap().output_tokens, 25);
            }
            other => panic!("expected MessageDelta, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parse_error_event() {
        let sse = "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);

        match stream.next().await.unwrap().unwrap() {
            SseEvent::Error(err) => {
                assert_eq!(err.error.type_, "overloaded_error");
                assert_eq!(err.error.message, "Overloaded");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_data_is_an_error() {
        let sse = "event: content_block_delta\ndata: not json\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);
        assert!(stream.next().await.unwrap().is_err());
    }
}
