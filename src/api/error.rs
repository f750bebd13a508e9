//! Mapping from gateway failures to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gateway::types::GatewayError;
use crate::listings::FetchError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    pub retryable: bool,
}

/// A failed request, carrying the gateway error that caused it.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GatewayError::ListingNotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::AlreadySold
        | GatewayError::NetworkMismatch { .. }
        | GatewayError::NotDeployedOnNetwork(_) => StatusCode::CONFLICT,
        GatewayError::Declined | GatewayError::AuthorizationDenied => StatusCode::FORBIDDEN,
        GatewayError::Reverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::NoProviderAvailable
        | GatewayError::ProviderUnreachable(_)
        | GatewayError::NoAccount => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::InvalidTransition(_) | GatewayError::Unknown(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self {
            status: status_for(&error),
            body: ErrorBody {
                error: error.to_string(),
                kind: error.kind(),
                retryable: error.is_retryable(),
            },
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(error: FetchError) -> Self {
        Self {
            status: status_for(&error.source),
            body: ErrorBody {
                error: error.source.to_string(),
                kind: error.source.kind(),
                retryable: error.retryable,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, kind = self.body.kind, error = %self.body.error, "Request failed");
        } else {
            tracing::info!(status = %self.status, kind = self.body.kind, error = %self.body.error, "Request rejected");
        }
        (self.status, Json(self.body)).into_response()
    }
}
