//! Route-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};

use crate::proxy::credential_cache::CredentialError;
use crate::proxy::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Missing or malformed request field
    #[error("{0}")]
    Validation(String),
    #[error("credential store is not configured")]
    StoreMisconfigured,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Upstream answered with a non-success status
    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, details: Value },
    /// Upstream could not be reached
    #[error(transparent)]
    Transport(#[from] UpstreamError),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StoreMisconfigured | Self::Credential(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } => *status,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Transport(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Validation(message) | Self::NotFound(message) => json!({ "error": message }),
            Self::StoreMisconfigured => json!({
                "error": "Credential store not configured",
                "message": "Set the credential store endpoint and access key, then restart the proxy.",
            }),
            Self::Credential(CredentialError::NotAvailable { tenant_id }) => json!({
                "error": "No credential available",
                "message": format!(
                    "No upstream token is stored for shop {}. Run the credential issuer for this shop and retry.",
                    tenant_id
                ),
            }),
            Self::Upstream { details, .. } => json!({
                "error": "Upstream request failed",
                "details": details,
            }),
            // Cause stays in the logs
            Self::Transport(_) => json!({
                "error": "Internal server error",
                "message": "Failed to reach the upstream service",
            }),
            Self::Internal(_) => json!({
                "error": "Internal server error",
                "message": "Unexpected error while handling the request",
            }),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && !matches!(self, Self::Upstream { .. }) {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
