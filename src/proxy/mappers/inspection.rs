// Inspection mapper
// Upstream repair order + inspection tree -> flat task list for callers
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One inspection as returned by the upstream inspections endpoint.
/// Every collection is optional so partial trees flatten instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "groups")]
    pub task_groups: Option<Vec<TaskGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tasks: Option<Vec<InspectionTask>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionTask {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Value,
    #[serde(default)]
    pub finding: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: Value,
    pub inspection_id: Value,
    pub name: Option<String>,
    pub group: Option<String>,
    pub current_rating: Value,
    pub current_finding: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOrder {
    pub id: Value,
    #[serde(default)]
    pub repair_order_number: Value,
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub vehicle: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionTasksResponse {
    pub ro_id: Value,
    pub ro_number: Value,
    pub customer: Value,
    pub vehicle: Value,
    pub tasks: Vec<TaskSummary>,
}

const CUSTOMER_FIELDS: &[&str] = &["id", "firstName", "lastName", "email", "phone"];
const VEHICLE_FIELDS: &[&str] = &["id", "year", "make", "model", "vin", "licensePlate"];

/// Upstream list endpoints answer either a bare array or a page object.
fn list_items<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Some(items) = value.as_array() {
        return items;
    }
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Scalar id or number rendered the way callers type it.
pub fn value_to_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Picks the search hit whose repair order number equals `ro_number`.
/// Search is fuzzy upstream, so a non-empty result is not proof of a match.
pub fn find_repair_order(search: &Value, ro_number: &str) -> Option<RepairOrder> {
    let wanted = ro_number.trim();
    list_items(search, &["content", "repairOrders", "data"])
        .iter()
        .filter(|item| {
            item.get("repairOrderNumber")
                .and_then(value_to_key)
                .is_some_and(|number| number == wanted)
        })
        .find_map(|item| serde_json::from_value::<RepairOrder>(item.clone()).ok())
}

pub fn parse_inspections(value: &Value) -> Result<Vec<Inspection>, serde_json::Error> {
    list_items(value, &["content", "inspections", "data"])
        .iter()
        .map(|item| serde_json::from_value(item.clone()))
        .collect()
}

/// Inspection -> task group -> task, flattened in upstream order.
pub fn flatten_tasks(inspections: &[Inspection]) -> Vec<TaskSummary> {
    inspections
        .iter()
        .flat_map(|inspection| {
            inspection
                .task_groups
                .iter()
                .flatten()
                .flat_map(move |group| {
                    group.tasks.iter().flatten().map(move |task| TaskSummary {
                        id: task.id.clone(),
                        inspection_id: inspection.id.clone(),
                        name: task.name.clone(),
                        group: group.name.clone(),
                        current_rating: task.rating.clone(),
                        current_finding: task.finding.clone(),
                    })
                })
        })
        .collect()
}

fn summarize(value: Option<&Value>, fields: &[&str]) -> Value {
    let Some(Value::Object(source)) = value else {
        return Value::Null;
    };
    let picked: Map<String, Value> = fields
        .iter()
        .filter_map(|field| source.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect();
    Value::Object(picked)
}

pub fn compose_response(repair_order: &RepairOrder, inspections: &[Inspection]) -> InspectionTasksResponse {
    InspectionTasksResponse {
        ro_id: repair_order.id.clone(),
        ro_number: repair_order.repair_order_number.clone(),
        customer: summarize(repair_order.customer.as_ref(), CUSTOMER_FIELDS),
        vehicle: summarize(repair_order.vehicle.as_ref(), VEHICLE_FIELDS),
        tasks: flatten_tasks(inspections),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inspection_tree(groups: usize, tasks_per_group: usize) -> Value {
        let groups: Vec<Value> = (0..groups)
            .map(|g| {
                let tasks: Vec<Value> = (0..tasks_per_group)
                    .map(|t| json!({ "id": g * 100 + t, "name": format!("task {g}-{t}"), "rating": null }))
                    .collect();
                json!({ "name": format!("group {g}"), "tasks": tasks })
            })
            .collect();
        json!([{ "id": 77, "name": "Courtesy", "taskGroups": groups }])
    }

    #[test]
    fn flattening_yields_groups_times_tasks() {
        for (n, m) in [(1, 1), (3, 4), (5, 0), (0, 5)] {
            let inspections = parse_inspections(&inspection_tree(n, m)).unwrap();
            let tasks = flatten_tasks(&inspections);
            assert_eq!(tasks.len(), n * m, "groups={n} tasks={m}");
            assert!(tasks.iter().all(|t| t.inspection_id == json!(77)));
        }
    }

    #[test]
    fn flattening_keeps_upstream_order() {
        let inspections = parse_inspections(&inspection_tree(2, 2)).unwrap();
        let ids: Vec<Value> = flatten_tasks(&inspections).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(100), json!(101)]);
    }

    #[test]
    fn missing_collections_contribute_nothing() {
        let value = json!({
            "content": [
                { "id": 1 },
                { "id": 2, "taskGroups": null },
                { "id": 3, "taskGroups": [] },
                { "id": 4, "taskGroups": [{ "name": "Brakes" }, { "name": "Tires", "tasks": null }] },
                { "id": 5, "groups": [{ "name": "Lights", "tasks": [{ "id": 9, "finding": "Bulb out", "rating": "RED" }] }] }
            ]
        });
        let inspections = parse_inspections(&value).unwrap();
        let tasks = flatten_tasks(&inspections);

        assert_eq!(tasks.len(), 1);
        assert_eq!(
            tasks[0],
            TaskSummary {
                id: json!(9),
                inspection_id: json!(5),
                name: None,
                group: Some("Lights".to_string()),
                current_rating: json!("RED"),
                current_finding: json!("Bulb out"),
            }
        );
    }

    #[test]
    fn unexpected_inspection_shape_is_empty() {
        assert!(parse_inspections(&json!({"message": "ok"})).unwrap().is_empty());
        assert!(parse_inspections(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn find_repair_order_requires_exact_number() {
        let search = json!({
            "content": [
                { "id": 1, "repairOrderNumber": 247150 },
                { "id": 2, "repairOrderNumber": 24715, "customer": { "firstName": "Ada" } }
            ]
        });
        let ro = find_repair_order(&search, "24715").unwrap();
        assert_eq!(ro.id, json!(2));
        assert!(find_repair_order(&search, "99").is_none());
    }

    #[test]
    fn find_repair_order_accepts_bare_array_and_string_numbers() {
        let search = json!([{ "id": "abc", "repairOrderNumber": " 24715 " }]);
        assert_eq!(find_repair_order(&search, "24715").unwrap().id, json!("abc"));
    }

    #[test]
    fn compose_picks_summary_fields() {
        let ro: RepairOrder = serde_json::from_value(json!({
            "id": 5,
            "repairOrderNumber": 24715,
            "customer": { "id": 8, "firstName": "Ada", "lastName": "L", "notes": "internal" },
            "vehicle": { "id": 3, "year": 2019, "make": "Honda", "model": "Fit", "color": "red" }
        }))
        .unwrap();

        let response = compose_response(&ro, &[]);
        let rendered = serde_json::to_value(&response).unwrap();

        assert_eq!(rendered["roId"], json!(5));
        assert_eq!(rendered["roNumber"], json!(24715));
        assert_eq!(rendered["customer"], json!({ "id": 8, "firstName": "Ada", "lastName": "L" }));
        assert_eq!(rendered["vehicle"], json!({ "id": 3, "year": 2019, "make": "Honda", "model": "Fit" }));
        assert_eq!(rendered["tasks"], json!([]));
    }

    #[test]
    fn compose_without_customer_is_null() {
        let ro: RepairOrder = serde_json::from_value(json!({ "id": 5, "repairOrderNumber": "1" })).unwrap();
        let response = compose_response(&ro, &[]);
        assert_eq!(response.customer, Value::Null);
        assert_eq!(response.vehicle, Value::Null);
    }

    #[test]
    fn task_summary_serializes_camel_case() {
        let task = TaskSummary {
            id: json!(1),
            inspection_id: json!(2),
            name: Some("Wipers".to_string()),
            group: None,
            current_rating: Value::Null,
            current_finding: Value::Null,
        };
        let rendered = serde_json::to_value(&task).unwrap();
        assert_eq!(rendered["inspectionId"], json!(2));
        assert!(rendered.get("currentRating").is_some());
        assert!(rendered.get("currentFinding").is_some());
    }
}
