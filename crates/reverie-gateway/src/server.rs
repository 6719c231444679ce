// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{delete, get, post},
};
use reverie_agent::{ProviderManager, Reverie, StaticJourneyRegistry, TurnOrchestrator};
use reverie_config::model::GatewayConfig;
use reverie_core::ReverieError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, sse, ws};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub manager: Arc<ProviderManager>,
    pub journeys: Arc<StaticJourneyRegistry>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(reverie: &Reverie) -> Self {
        Self {
            orchestrator: Arc::clone(reverie.orchestrator()),
            manager: Arc::clone(reverie.manager()),
            journeys: Arc::clone(reverie.journeys()),
            start_time: Instant::now(),
        }
    }
}

/// Every gateway route.
///
/// - `GET /health`
/// - `POST /v1/turns` (JSON, or SSE with `Accept: text/event-stream`)
/// - `GET|POST /v1/conversations`, `GET|DELETE /v1/conversations/{id}`
/// - `DELETE /v1/conversations/{id}/messages?after=<message_id>`
/// - `GET /v1/conversations/{id}/onboarding`
/// - `POST /v1/conversations/{id}/reanalyze` (SSE)
/// - `DELETE /v1/messages/{id}`
/// - `GET /v1/journeys`, `POST /v1/journeys/{id}/start`
/// - `GET /v1/profile`
/// - `GET|PUT /v1/provider`
/// - `GET /ws`
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/turns", post(handlers::post_turn))
        .route(
            "/v1/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/v1/conversations/{id}",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route(
            "/v1/conversations/{id}/messages",
            delete(handlers::delete_messages_after),
        )
        .route(
            "/v1/conversations/{id}/onboarding",
            get(handlers::get_onboarding),
        )
        .route(
            "/v1/conversations/{id}/reanalyze",
            post(sse::reanalyze_conversation),
        )
        .route("/v1/messages/{id}", delete(handlers::delete_message))
        .route("/v1/journeys", get(handlers::list_journeys))
        .route("/v1/journeys/{id}/start", post(handlers::start_journey))
        .route("/v1/profile", get(handlers::get_profile))
        .route(
            "/v1/provider",
            get(handlers::get_provider).put(handlers::put_provider),
        )
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until `shutdown` is cancelled.
pub async fn serve(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ReverieError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ReverieError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ReverieError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
