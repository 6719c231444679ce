// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket push channel for streaming turns.
//!
//! Client -> Server (JSON):
//! ```json
//! {"content": "Today felt long", "conversation_id": "optional-conversation-id"}
//! ```
//!
//! Server -> Client (JSON), one frame per turn event:
//! ```json
//! {"type": "thinking"}
//! {"type": "chunk", "text": "partial..."}
//! {"type": "done", "conversation_id": "...", "message_id": "...", "title": null}
//! {"type": "error", "message": "..."}
//! ```
//!
//! Turns on one socket run one at a time.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use reverie_agent::TurnEvent;

use crate::handlers::TurnRequest;
use crate::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("websocket connected");

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let request: TurnRequest = match serde_json::from_str(text.as_str()) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(error = %e, "invalid websocket message");
                        let error = TurnEvent::Error {
                            message: format!("invalid message: {e}"),
                        };
                        if push(&mut sender, &error).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };
                if run_turn(&state, &mut sender, request).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping (answered by the protocol layer)
        }
    }

    tracing::debug!("websocket closed");
}

/// Streams one turn to the socket. Errs when the client is gone, which drops
/// the event receiver and abandons the turn.
async fn run_turn(
    state: &GatewayState,
    sender: &mut SplitSink<WebSocket, Message>,
    request: TurnRequest,
) -> Result<(), axum::Error> {
    let mut rx = match state
        .orchestrator
        .stream_turn(&request.content, request.conversation_id.as_deref())
        .await
    {
        Ok(rx) => rx,
        Err(e) => {
            return push(
                sender,
                &TurnEvent::Error {
                    message: e.to_string(),
                },
            )
            .await;
        }
    };

    while let Some(event) = rx.recv().await {
        push(sender, &event).await?;
    }
    Ok(())
}

async fn push(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &TurnEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
