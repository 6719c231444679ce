// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`ReverieError`] to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reverie_core::ReverieError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`ReverieError`] leaving through the HTTP surface.
#[derive(Debug)]
pub struct ApiError(pub ReverieError);

impl From<ReverieError> for ApiError {
    fn from(error: ReverieError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ReverieError::NotFound { .. } => StatusCode::NOT_FOUND,
            ReverieError::EmptyInput | ReverieError::Validation(_) => StatusCode::BAD_REQUEST,
            ReverieError::Config(_) | ReverieError::AdapterNotFound { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ReverieError::NotInitialized(_) => StatusCode::SERVICE_UNAVAILABLE,
            ReverieError::Provider { .. }
            | ReverieError::Http { .. }
            | ReverieError::EmptyGeneration => StatusCode::BAD_GATEWAY,
            ReverieError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ReverieError::Storage { .. } | ReverieError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError(ReverieError::not_found("conversation", "c1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError(ReverieError::EmptyInput).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(ReverieError::Config("missing api key".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn backend_errors_map_to_gateway_statuses() {
        assert_eq!(
            ApiError(ReverieError::EmptyGeneration).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(ReverieError::provider("connection refused")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(ReverieError::NotInitialized("provider".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
