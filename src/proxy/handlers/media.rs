// Presigned video upload target
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{call_upstream, id_param, parse_body, passthrough_response, require_credentials, resolve_token};
use crate::proxy::error::ProxyError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::{paths, UpstreamCallSpec};

const ROUTE: &str = "upload-video/presigned";
const DEFAULT_FILE_TYPE: &str = "video/mp4";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUploadRequest {
    pub shop_id: Option<Value>,
    pub ro_id: Option<Value>,
    pub inspection_id: Option<Value>,
    #[serde(alias = "itemId")]
    pub task_id: Option<Value>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

pub async fn handle_presigned_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    require_credentials(&state)?;
    let body: PresignedUploadRequest = parse_body(&body)?;
    let (Some(shop_id), Some(ro_id), Some(inspection_id), Some(task_id)) = (
        id_param(body.shop_id.as_ref()),
        id_param(body.ro_id.as_ref()),
        id_param(body.inspection_id.as_ref()),
        id_param(body.task_id.as_ref()),
    ) else {
        return Err(ProxyError::validation(
            "Missing shopId, roId, inspectionId or taskId",
        ));
    };

    let file_name = body
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("video-{}.mp4", task_id));
    let file_type = body
        .file_type
        .filter(|kind| !kind.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string());

    let token = resolve_token(&state, &shop_id).await?;
    let spec = UpstreamCallSpec::post(paths::video_upload_target(&ro_id, &inspection_id, &task_id))
        .with_json(json!({ "fileName": file_name, "fileType": file_type }));

    let resp = call_upstream(&state, spec, &token, &shop_id, ROUTE).await?;
    if !resp.is_success() {
        tracing::warn!(shop_id = %shop_id, status = resp.status.as_u16(), "presigned upload request rejected upstream");
    }
    passthrough_response(resp)
}
