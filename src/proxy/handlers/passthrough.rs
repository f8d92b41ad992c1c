// Generic passthrough: /api/tm/<rest> -> upstream /api/<rest>
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Uri};
use axum::response::Response;
use url::form_urlencoded;

use super::{call_upstream, passthrough_response, require_credentials, resolve_token};
use crate::proxy::error::ProxyError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::{paths, UpstreamCallSpec};

const ROUTE: &str = "tm-passthrough";

/// `shopId` selects the credential; every other pair goes upstream in order.
fn split_query(query: Option<&str>) -> (Option<String>, Option<String>) {
    let mut shop_id = None;
    let mut forwarded = form_urlencoded::Serializer::new(String::new());
    let mut any = false;

    for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        if key == "shopId" {
            if shop_id.is_none() && !value.trim().is_empty() {
                shop_id = Some(value.trim().to_string());
            }
            continue;
        }
        forwarded.append_pair(&key, &value);
        any = true;
    }

    (shop_id, any.then(|| forwarded.finish()))
}

fn upstream_path(uri: &Uri) -> Option<(Option<String>, String)> {
    let path = paths::rewrite_passthrough(uri.path())?;
    let (shop_id, query) = split_query(uri.query());
    let target = match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };
    Some((shop_id, target))
}

pub async fn handle_passthrough(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    require_credentials(&state)?;
    let Some((shop_id, target)) = upstream_path(&uri) else {
        return Err(ProxyError::NotFound("Not found".to_string()));
    };
    let shop_id = shop_id.ok_or_else(|| ProxyError::validation("Missing shopId"))?;

    let token = resolve_token(&state, &shop_id).await?;

    // Body bytes and media type go upstream untouched
    let mut spec = UpstreamCallSpec::new(method, target);
    if !body.is_empty() {
        spec = spec.with_raw_body(body, headers.get(header::CONTENT_TYPE).cloned());
    }

    tracing::debug!(shop_id = %shop_id, method = %spec.method, path = %spec.path, "passthrough");
    let resp = call_upstream(&state, spec, &token, &shop_id, ROUTE).await?;
    passthrough_response(resp)
}
