//! Relative upstream paths used by the route handlers.

use url::form_urlencoded;

pub const API_PREFIX: &str = "/api";
pub const PASSTHROUGH_PREFIX: &str = "/api/tm";

pub fn repair_order_search(shop_id: &str, ro_number: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("shop", shop_id)
        .append_pair("search", ro_number)
        .finish();
    format!("{}/v1/repair-orders?{}", API_PREFIX, query)
}

pub fn inspections(ro_id: &str) -> String {
    format!("{}/v1/repair-orders/{}/inspections", API_PREFIX, segment(ro_id))
}

pub fn inspection_task(ro_id: &str, inspection_id: &str, task_id: &str) -> String {
    format!(
        "{}/v1/repair-orders/{}/inspections/{}/tasks/{}",
        API_PREFIX,
        segment(ro_id),
        segment(inspection_id),
        segment(task_id)
    )
}

pub fn video_upload_target(ro_id: &str, inspection_id: &str, task_id: &str) -> String {
    format!(
        "{}/media/video-upload-url",
        inspection_task(ro_id, inspection_id, task_id)
    )
}

/// Maps `/api/tm/<rest>` onto `/api/<rest>`. `None` if the path is outside the prefix.
pub fn rewrite_passthrough(path: &str) -> Option<String> {
    let rest = path.strip_prefix(PASSTHROUGH_PREFIX)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(format!("{}{}", API_PREFIX, rest))
}

// Identifiers come from callers; keep them inside one path segment.
// `byte_serialize` writes a space as `+`, which a path reads as a literal
// plus; a caller's own `+` is already `%2B`, so every `+` here is a space.
fn segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
