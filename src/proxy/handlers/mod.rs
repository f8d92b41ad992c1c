// Handlers module - API endpoint handlers

pub mod health;
pub mod inspections;
pub mod media;
pub mod passthrough;
pub mod tasks;

use std::any::Any;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::proxy::credential_cache::CredentialCache;
use crate::proxy::error::ProxyError;
use crate::proxy::mappers::inspection::value_to_key;
use crate::proxy::server::AppState;
use crate::proxy::upstream::{UpstreamCallSpec, UpstreamResponse};

/// Credential cache, or 503 when no store is configured. Tenant routes call
/// this before validating the request.
pub(crate) fn require_credentials(state: &AppState) -> Result<&CredentialCache, ProxyError> {
    state
        .credentials
        .as_deref()
        .ok_or(ProxyError::StoreMisconfigured)
}

/// Token for `shop_id` from the credential cache.
pub(crate) async fn resolve_token(state: &AppState, shop_id: &str) -> Result<String, ProxyError> {
    Ok(require_credentials(state)?.get_credential(shop_id).await?)
}

/// One forwarder call with route context attached to transport failures.
pub(crate) async fn call_upstream(
    state: &AppState,
    spec: UpstreamCallSpec,
    token: &str,
    shop_id: &str,
    route: &'static str,
) -> Result<UpstreamResponse, ProxyError> {
    let method = spec.method.clone();
    state.upstream.forward(spec, token).await.map_err(|e| {
        tracing::error!(shop_id = %shop_id, route, method = %method, error = %e, "upstream transport failure");
        ProxyError::Transport(e)
    })
}

/// Parsed JSON body of a successful upstream answer; anything else becomes
/// an error carrying the upstream status.
pub(crate) fn expect_success_json(resp: &UpstreamResponse, route: &'static str) -> Result<Value, ProxyError> {
    if !resp.is_success() {
        tracing::warn!(route, status = resp.status.as_u16(), "upstream returned an error status");
        return Err(ProxyError::Upstream {
            status: resp.status,
            details: resp.body_as_details(),
        });
    }
    resp.json()
        .map_err(|e| ProxyError::Internal(format!("{route}: upstream sent invalid JSON: {e}")))
}

/// Upstream status, content type and body, unchanged.
pub(crate) fn passthrough_response(resp: UpstreamResponse) -> Result<Response, ProxyError> {
    let mut builder = Response::builder().status(resp.status);
    if let Some(content_type) = resp.content_type() {
        builder = builder.header(header::CONTENT_TYPE, content_type.clone());
    }
    builder
        .body(Body::from(resp.body))
        .map_err(|e| ProxyError::Internal(e.to_string()))
}

/// JSON request body. An empty body reads as all fields absent so the
/// handler reports which identifiers are missing.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ProxyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ProxyError::validation(format!("Invalid JSON body: {e}")))
}

/// Non-empty string field from a query parameter.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Identifier from a JSON body; callers send ids as strings or numbers.
pub(crate) fn id_param(value: Option<&Value>) -> Option<String> {
    value.and_then(value_to_key)
}

pub async fn not_found() -> Response {
    ProxyError::NotFound("Not found".to_string()).into_response()
}

/// Response for a handler that panicked.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");
    ProxyError::Internal(detail).into_response()
}
