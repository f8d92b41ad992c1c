// Inspection task update
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;

use super::{call_upstream, id_param, parse_body, passthrough_response, require_credentials, resolve_token};
use crate::proxy::error::ProxyError;
use crate::proxy::mappers::task_update::build_task_update;
use crate::proxy::server::AppState;
use crate::proxy::upstream::{paths, UpstreamCallSpec};

const ROUTE: &str = "update-inspection-item";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateRequest {
    pub shop_id: Option<Value>,
    pub ro_id: Option<Value>,
    pub inspection_id: Option<Value>,
    #[serde(alias = "itemId")]
    pub task_id: Option<Value>,
    pub task: Option<Value>,
    pub rating: Option<Value>,
    pub finding: Option<Value>,
}

pub async fn handle_update_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    require_credentials(&state)?;
    let body: TaskUpdateRequest = parse_body(&body)?;
    let (Some(shop_id), Some(ro_id), Some(inspection_id), Some(task_id_key)) = (
        id_param(body.shop_id.as_ref()),
        id_param(body.ro_id.as_ref()),
        id_param(body.inspection_id.as_ref()),
        id_param(body.task_id.as_ref()),
    ) else {
        return Err(ProxyError::validation(
            "Missing shopId, roId, inspectionId or taskId",
        ));
    };
    // Presence checked above; keep the caller's JSON type for the id
    let task_id = body.task_id.unwrap_or(Value::Null);

    let payload = build_task_update(
        &task_id,
        body.task.as_ref(),
        body.rating.as_ref(),
        body.finding.as_ref(),
    );

    let token = resolve_token(&state, &shop_id).await?;
    let spec = UpstreamCallSpec::put(paths::inspection_task(&ro_id, &inspection_id, &task_id_key))
        .with_json(payload);

    let resp = call_upstream(&state, spec, &token, &shop_id, ROUTE).await?;
    tracing::info!(
        shop_id = %shop_id,
        task_id = %task_id_key,
        status = resp.status.as_u16(),
        "inspection task update forwarded"
    );
    passthrough_response(resp)
}
