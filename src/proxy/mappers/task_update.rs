// Task update mapper
// Partial caller input -> full task payload the upstream PUT accepts
use serde_json::{json, Map, Value};

/// Fields the upstream schema requires on every task update, with the value
/// used when the caller leaves them out.
fn task_defaults(task_id: &Value) -> Map<String, Value> {
    let defaults = json!({
        "id": task_id,
        "rating": null,
        "finding": "",
        "recommendation": "",
        "technicianNotes": "",
        "mediaIds": [],
        "approved": false,
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Builds the update payload: defaults, then the caller's `task` object,
/// then explicit `rating` / `finding`. The id always matches the route target.
pub fn build_task_update(
    task_id: &Value,
    task: Option<&Value>,
    rating: Option<&Value>,
    finding: Option<&Value>,
) -> Value {
    let mut payload = task_defaults(task_id);

    if let Some(Value::Object(fields)) = task {
        for (key, value) in fields {
            payload.insert(key.clone(), value.clone());
        }
    }
    if let Some(rating) = rating {
        payload.insert("rating".to_string(), rating.clone());
    }
    if let Some(finding) = finding {
        payload.insert("finding".to_string(), finding.clone());
    }
    payload.insert("id".to_string(), task_id.clone());

    Value::Object(payload)
}
