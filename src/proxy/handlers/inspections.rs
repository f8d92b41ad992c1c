// Inspection task listing
// search repair order by number -> load inspections -> flat task list
use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use super::{call_upstream, expect_success_json, non_empty, require_credentials, resolve_token};
use crate::proxy::error::ProxyError;
use crate::proxy::mappers::inspection::{
    compose_response, find_repair_order, parse_inspections, value_to_key, InspectionTasksResponse,
};
use crate::proxy::server::AppState;
use crate::proxy::upstream::{paths, UpstreamCallSpec};

const ROUTE: &str = "get-inspections";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionsQuery {
    pub shop_id: Option<String>,
    pub ro_number: Option<String>,
}

pub async fn handle_get_inspections(
    State(state): State<AppState>,
    Query(query): Query<InspectionsQuery>,
) -> Result<Json<InspectionTasksResponse>, ProxyError> {
    require_credentials(&state)?;
    let (Some(shop_id), Some(ro_number)) = (non_empty(query.shop_id), non_empty(query.ro_number))
    else {
        return Err(ProxyError::validation("Missing shopId or roNumber"));
    };

    let token = resolve_token(&state, &shop_id).await?;

    let search = call_upstream(
        &state,
        UpstreamCallSpec::get(paths::repair_order_search(&shop_id, &ro_number)),
        &token,
        &shop_id,
        ROUTE,
    )
    .await?;
    let search = expect_success_json(&search, ROUTE)?;

    let repair_order = find_repair_order(&search, &ro_number)
        .ok_or_else(|| ProxyError::NotFound(format!("Repair order {} not found", ro_number)))?;
    let ro_id = value_to_key(&repair_order.id)
        .ok_or_else(|| ProxyError::Internal("repair order without id".to_string()))?;

    let inspections = call_upstream(
        &state,
        UpstreamCallSpec::get(paths::inspections(&ro_id)),
        &token,
        &shop_id,
        ROUTE,
    )
    .await?;
    let inspections = expect_success_json(&inspections, ROUTE)?;
    let inspections = parse_inspections(&inspections)
        .map_err(|e| ProxyError::Internal(format!("{ROUTE}: malformed inspections: {e}")))?;

    let response = compose_response(&repair_order, &inspections);
    tracing::info!(
        shop_id = %shop_id,
        ro_number = %ro_number,
        tasks = response.tasks.len(),
        "inspection tasks listed"
    );
    Ok(Json(response))
}
