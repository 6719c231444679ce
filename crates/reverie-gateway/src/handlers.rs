// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use reverie_agent::{ConversationDetail, ProfileView, ProviderConfigUpdate, TurnReply};
use reverie_config::model::ProviderConfig;
use reverie_core::{
    ConnectionStatus, Conversation, GuidedOnboardingState, Journey, JourneyRegistry,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;
use crate::sse;

type ApiResult<T> = Result<T, ApiError>;

/// Request body for POST /v1/turns.
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub content: String,
    /// Continue this conversation instead of the most recent one.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub provider: ConnectionStatus,
}

/// Query for DELETE /v1/conversations/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct AfterQuery {
    pub after: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub removed: usize,
}

/// Response body for the provider endpoints. Credentials are redacted.
#[derive(Debug, Serialize)]
pub struct ProviderResponse {
    pub config: Option<ProviderConfig>,
    pub status: ConnectionStatus,
    /// Set by PUT: whether the update replaced the provider instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuilt: Option<bool>,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        provider: state.manager.status().await,
    })
}

/// POST /v1/turns
///
/// Runs a blocking turn. With `Accept: text/event-stream` the turn is
/// streamed as Server-Sent Events instead.
pub async fn post_turn(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<TurnRequest>,
) -> ApiResult<Response> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if accept.contains("text/event-stream") {
        return sse::stream_turn(state, body).await;
    }

    let reply: TurnReply = state
        .orchestrator
        .send_turn(&body.content, body.conversation_id.as_deref())
        .await?;
    Ok(Json(reply).into_response())
}

/// GET /v1/conversations
pub async fn list_conversations(
    State(state): State<GatewayState>,
) -> ApiResult<Json<Vec<Conversation>>> {
    Ok(Json(state.orchestrator.list_conversations().await?))
}

/// POST /v1/conversations
pub async fn create_conversation(
    State(state): State<GatewayState>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state.orchestrator.new_conversation().await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /v1/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationDetail>> {
    Ok(Json(state.orchestrator.get_conversation(&id).await?))
}

/// DELETE /v1/conversations/{id}
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.orchestrator.delete_conversation(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/conversations/{id}/messages?after={message_id}
pub async fn delete_messages_after(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Query(query): Query<AfterQuery>,
) -> ApiResult<Json<DeletedResponse>> {
    let removed = state
        .orchestrator
        .delete_messages_after(&id, &query.after)
        .await?;
    Ok(Json(DeletedResponse { removed }))
}

/// GET /v1/conversations/{id}/onboarding
pub async fn get_onboarding(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<GuidedOnboardingState>> {
    Ok(Json(state.orchestrator.onboarding_state(&id).await?))
}

/// DELETE /v1/messages/{id}
pub async fn delete_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.orchestrator.delete_message(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/journeys
pub async fn list_journeys(State(state): State<GatewayState>) -> Json<Vec<Journey>> {
    Json(state.journeys.list())
}

/// POST /v1/journeys/{id}/start
pub async fn start_journey(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state.orchestrator.start_journey(&id).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /v1/profile
pub async fn get_profile(State(state): State<GatewayState>) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.orchestrator.profile().await?))
}

/// GET /v1/provider
pub async fn get_provider(State(state): State<GatewayState>) -> Json<ProviderResponse> {
    Json(ProviderResponse {
        config: state.manager.config().await,
        status: state.manager.status().await,
        rebuilt: None,
    })
}

/// PUT /v1/provider
///
/// Applies a partial update. A failed rebuild keeps the previous provider
/// and answers with the error.
pub async fn put_provider(
    State(state): State<GatewayState>,
    Json(update): Json<ProviderConfigUpdate>,
) -> ApiResult<Json<ProviderResponse>> {
    let rebuilt = state.manager.update_config(&update).await?;
    Ok(Json(ProviderResponse {
        config: state.manager.config().await,
        status: state.manager.status().await,
        rebuilt: Some(rebuilt),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use reverie_test_utils::{MockProvider, TestHarness};
    use tower::ServiceExt;

    use crate::server::router;

    async fn harness() -> TestHarness {
        TestHarness::builder()
            .with_provider(MockProvider::with_handler(|_| "I hear you.".to_string()))
            .with_journey("values", "Guide the user through their values.")
            .without_memory()
            .build()
            .await
            .unwrap()
    }

    async fn call(
        harness: &TestHarness,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router(GatewayState::new(&harness.reverie))
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[test]
    fn turn_request_deserializes_with_content() {
        let req: TurnRequest = serde_json::from_str(r#"{"content": "Hello"}"#).unwrap();
        assert_eq!(req.content, "Hello");
        assert!(req.conversation_id.is_none());
    }

    #[tokio::test]
    async fn health_reports_provider_status() {
        let harness = harness().await;
        let (status, json) = call(&harness, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"]["ok"], true);
    }

    #[tokio::test]
    async fn turn_returns_reply_and_title() {
        let harness = harness().await;
        let (status, json) = call(
            &harness,
            "POST",
            "/v1/turns",
            Some(serde_json::json!({"content": "A calm evening at home"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "I hear you.");
        assert_eq!(json["title"], "A calm evening at home");
        assert!(json["conversation_id"].is_string());
    }

    #[tokio::test]
    async fn empty_turn_is_bad_request() {
        let harness = harness().await;
        let (status, json) = call(
            &harness,
            "POST",
            "/v1/turns",
            Some(serde_json::json!({"content": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let harness = harness().await;
        let (status, _) = call(&harness, "GET", "/v1/conversations/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&harness, "DELETE", "/v1/conversations/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversation_lifecycle() {
        let harness = harness().await;
        let (status, created) = call(&harness, "POST", "/v1/conversations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        call(
            &harness,
            "POST",
            "/v1/turns",
            Some(serde_json::json!({"content": "First entry today", "conversation_id": id})),
        )
        .await;
        call(
            &harness,
            "POST",
            "/v1/turns",
            Some(serde_json::json!({"content": "Second entry today", "conversation_id": id})),
        )
        .await;

        let (_, detail) = call(&harness, "GET", &format!("/v1/conversations/{id}"), None).await;
        let messages = detail["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(detail["onboarding"]["is_active"], false);
        let first_id = messages[0]["id"].as_str().unwrap().to_string();

        let (status, removed) = call(
            &harness,
            "DELETE",
            &format!("/v1/conversations/{id}/messages?after={first_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removed["removed"], 3);

        let (status, _) = call(&harness, "DELETE", &format!("/v1/messages/{first_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&harness, "DELETE", &format!("/v1/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, list) = call(&harness, "GET", "/v1/conversations", None).await;
        assert_eq!(list.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn journeys_can_be_listed_and_started() {
        let harness = harness().await;
        let (_, journeys) = call(&harness, "GET", "/v1/journeys", None).await;
        assert_eq!(journeys[0]["id"], "values");

        let (status, conversation) =
            call(&harness, "POST", "/v1/journeys/values/start", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(conversation["journey_id"], "values");

        let id = conversation["id"].as_str().unwrap();
        let (_, onboarding) = call(
            &harness,
            "GET",
            &format!("/v1/conversations/{id}/onboarding"),
            None,
        )
        .await;
        assert_eq!(onboarding["is_active"], true);

        let (status, _) = call(&harness, "POST", "/v1/journeys/missing/start", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_starts_empty() {
        let harness = harness().await;
        let (status, json) = call(&harness, "GET", "/v1/profile", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["narrative"].is_null());
    }

    #[tokio::test]
    async fn provider_update_rebuilds_only_when_needed() {
        let harness = harness().await;
        let (status, json) = call(
            &harness,
            "PUT",
            "/v1/provider",
            Some(serde_json::json!({"max_tokens": 512})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rebuilt"], false);
        assert_eq!(json["config"]["max_tokens"], 512);

        let (_, json) = call(
            &harness,
            "PUT",
            "/v1/provider",
            Some(serde_json::json!({"backend": "anthropic", "anthropic_api_key": "sk-test"})),
        )
        .await;
        assert_eq!(json["rebuilt"], true);
        assert_eq!(json["config"]["backend"], "anthropic");
        assert_eq!(json["config"]["anthropic"]["api_key"], "********");
    }

    #[tokio::test]
    async fn provider_update_rejects_unknown_fields() {
        let harness = harness().await;
        let (status, _) = call(
            &harness,
            "PUT",
            "/v1/provider",
            Some(serde_json::json!({"colour": "blue"})),
        )
        .await;
        assert!(status.is_client_error());
    }
}
