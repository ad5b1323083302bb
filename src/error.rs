//! HTTP-facing error taxonomy.
//!
//! Every failure is contained at the handler: it becomes a status code plus a
//! `{"error": "..."}` body and never affects another session or request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::gitlab::client::UpstreamError;
use crate::transport::registry::{DeliveryError, RegistryError};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Injection target is not an open session.
    #[error("session not found")]
    SessionNotFound,

    /// Freshly minted id already present in the registry.
    #[error("session id collision")]
    SessionCollision,

    #[error("invalid json")]
    InvalidJson,

    /// Tool input lacks a usable `name`.
    #[error("name required")]
    NameRequired,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<DeliveryError> for GatewayError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::UnknownSession => GatewayError::SessionNotFound,
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        tracing::error!(error = %err, "Failed to register session");
        GatewayError::SessionCollision
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::SessionNotFound => StatusCode::NOT_FOUND,
            GatewayError::SessionCollision => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidJson | GatewayError::NameRequired => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(err) => match err {
                UpstreamError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                UpstreamError::Url(_) => StatusCode::BAD_REQUEST,
                UpstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                UpstreamError::Transport(_) => StatusCode::BAD_GATEWAY,
                UpstreamError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn public_message(&self) -> String {
        match self {
            GatewayError::Upstream(UpstreamError::Transport(_)) => "upstream request failed".to_string(),
            GatewayError::Upstream(UpstreamError::Client(_)) => "upstream client unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
