// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events for streaming turns and conversation re-analysis.
//!
//! Turn event format:
//! ```text
//! event: thinking
//! data: {"type":"thinking"}
//!
//! event: chunk
//! data: {"type":"chunk","text":"partial content"}
//!
//! event: done
//! data: {"type":"done","conversation_id":"...","message_id":"...","title":null}
//! ```
//!
//! Re-analysis emits `progress` events followed by one `done` (with the
//! report) or `error`.
//!
//! Closing the HTTP connection drops the event receiver, which abandons the
//! turn on the orchestrator side.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream};
use reverie_agent::TurnEvent;
use reverie_memory::{ReanalysisProgress, ReanalysisReport};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::handlers::TurnRequest;
use crate::server::GatewayState;

const REANALYSIS_BUFFER: usize = 16;

/// Events of a re-analysis stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReanalysisEvent {
    Progress(ReanalysisProgress),
    Done(ReanalysisReport),
    Error { message: String },
}

impl ReanalysisEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Done(_) => "done",
            Self::Error { .. } => "error",
        }
    }
}

fn turn_event_name(event: &TurnEvent) -> &'static str {
    match event {
        TurnEvent::Chunk { .. } => "chunk",
        TurnEvent::Thinking => "thinking",
        TurnEvent::Done { .. } => "done",
        TurnEvent::Error { .. } => "error",
    }
}

fn to_sse(name: &'static str, payload: &impl Serialize) -> Event {
    match serde_json::to_string(payload) {
        Ok(json) => Event::default().event(name).data(json),
        Err(e) => Event::default()
            .event("error")
            .data(format!(r#"{{"type":"error","message":"{e}"}}"#)),
    }
}

/// Drains `rx` into an SSE body.
fn receiver_stream<T, F>(
    rx: mpsc::Receiver<T>,
    encode: F,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    F: Fn(&T) -> Event,
{
    stream::unfold((rx, encode), |(mut rx, encode)| async move {
        let item = rx.recv().await?;
        let event = encode(&item);
        Some((Ok(event), (rx, encode)))
    })
}

/// Streams one turn. Failures before generation (empty input, unknown
/// conversation, no provider) are plain HTTP errors.
pub async fn stream_turn(state: GatewayState, body: TurnRequest) -> Result<Response, ApiError> {
    let rx = state
        .orchestrator
        .stream_turn(&body.content, body.conversation_id.as_deref())
        .await?;

    let events = receiver_stream(rx, |event| to_sse(turn_event_name(event), event));
    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// POST /v1/conversations/{id}/reanalyze
pub async fn reanalyze_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    // Unknown conversations fail before the stream opens.
    state.orchestrator.get_conversation(&id).await?;

    let (tx, rx) = mpsc::channel::<ReanalysisEvent>(REANALYSIS_BUFFER);
    let orchestrator = state.orchestrator.clone();
    state.orchestrator.tracker().spawn(async move {
        let (progress_tx, mut progress_rx) =
            mpsc::channel::<ReanalysisProgress>(REANALYSIS_BUFFER);
        let run = async move {
            orchestrator
                .reanalyze_conversation(&id, &progress_tx)
                .await
        };
        // Owns the receiver so a gone client unblocks the sender side.
        let progress_sink = tx.clone();
        let forward = async move {
            while let Some(progress) = progress_rx.recv().await {
                if progress_sink
                    .send(ReanalysisEvent::Progress(progress))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        };
        let (result, ()) = tokio::join!(run, forward);

        let last = match result {
            Ok(report) => ReanalysisEvent::Done(report),
            Err(e) => ReanalysisEvent::Error {
                message: e.to_string(),
            },
        };
        let _ = tx.send(last).await;
    });

    let events = receiver_stream(rx, |event| to_sse(event.name(), event));
    Ok(Sse::new(events).into_response())
}
