// Liveness handler
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::proxy::server::AppState;

/// Process liveness only. Never touches the credential store or the upstream.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "shop-proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "credentialStoreConfigured": state.credential_store_configured(),
        "cachedTenantCount": state.credentials.as_ref().map_or(0, |c| c.len()),
        "uptimeSeconds": state.started_at.elapsed().as_secs_f64(),
    }))
}
