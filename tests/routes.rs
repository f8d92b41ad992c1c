//! End-to-end route tests: a real listener, a REST credential store and an
//! upstream, both served by httpmock.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};

use shop_proxy::proxy::{AppState, AxumServer, CredentialStoreConfig, ProxyConfig};

struct Harness {
    base: String,
    client: reqwest::Client,
    server: Option<AxumServer>,
}

impl Harness {
    async fn start(config: ProxyConfig) -> Self {
        let state = AppState::from_config(&config).unwrap();
        let (server, _handle) = AxumServer::start("127.0.0.1".to_string(), 0, state, &config)
            .await
            .unwrap();
        Self {
            base: format!("http://{}", server.local_addr()),
            client: reqwest::Client::new(),
            server: Some(server),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.stop();
        }
    }
}

fn config_for(store: &MockServer, upstream: &MockServer) -> ProxyConfig {
    ProxyConfig {
        upstream_base_url: upstream.base_url(),
        credential_store: Some(CredentialStoreConfig {
            endpoint: store.base_url(),
            access_key: "anon-key".to_string(),
            table: "shop_tokens".to_string(),
        }),
        connect_timeout_secs: 5,
        ..ProxyConfig::default()
    }
}

async fn mock_token<'a>(store: &'a MockServer, shop_id: &str, token: &str) -> httpmock::Mock<'a> {
    let shop_filter = format!("eq.{shop_id}");
    let rows = json!([{
        "shop_id": shop_id,
        "access_token": token,
        "issued_at": "2026-01-01T00:00:00Z",
        "expires_at": "2099-01-01T00:00:00Z"
    }]);
    store
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/rest/v1/shop_tokens")
                .query_param("shop_id", shop_filter.as_str())
                .header("apikey", "anon-key");
            then.status(200).json_body(rows);
        })
        .await
}

async fn mock_no_token<'a>(store: &'a MockServer, shop_id: &str) -> httpmock::Mock<'a> {
    let shop_filter = format!("eq.{shop_id}");
    store
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/rest/v1/shop_tokens")
                .query_param("shop_id", shop_filter.as_str());
            then.status(200).json_body(json!([]));
        })
        .await
}

async fn mock_repair_order_tree(upstream: &MockServer) {
    upstream
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/repair-orders")
                .query_param("shop", "6212")
                .query_param("search", "24715")
                .header("authorization", "Bearer tok-6212");
            then.status(200).json_body(json!({
                "content": [{
                    "id": 555,
                    "repairOrderNumber": 24715,
                    "customer": { "id": 1, "firstName": "Ada", "lastName": "Lovelace" },
                    "vehicle": { "id": 2, "year": 2019, "make": "Honda", "model": "Fit" }
                }]
            }));
        })
        .await;
    upstream
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/repair-orders/555/inspections")
                .header("authorization", "Bearer tok-6212");
            then.status(200).json_body(json!([
                {
                    "id": 71,
                    "name": "Courtesy",
                    "taskGroups": [{ "name": "Brakes", "tasks": [{ "id": 1, "name": "Front pads", "rating": "GREEN" }] }]
                },
                {
                    "id": 72,
                    "name": "Multi-point",
                    "taskGroups": [{ "name": "Tires", "tasks": [{ "id": 2, "name": "Tread depth", "finding": "4/32" }] }]
                }
            ]));
        })
        .await;
}

#[tokio::test]
async fn inspection_tasks_are_listed() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;
    mock_token(&store, "6212", "tok-6212").await;
    mock_repair_order_tree(&upstream).await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .get(harness.url("/api/get-inspections?shopId=6212&roNumber=24715"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["roId"], 555);
    assert_eq!(body["roNumber"], 24715);
    assert_eq!(body["customer"]["firstName"], "Ada");
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["inspectionId"], 71);
    assert_eq!(tasks[0]["currentRating"], "GREEN");
    assert_eq!(tasks[1]["currentFinding"], "4/32");
}

#[tokio::test]
async fn credential_is_read_once_within_ttl() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;
    let token_mock = mock_token(&store, "6212", "tok-6212").await;
    mock_repair_order_tree(&upstream).await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    for _ in 0..3 {
        let resp = harness
            .client
            .get(harness.url("/api/get-inspections?shopId=6212&roNumber=24715"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    assert_eq!(token_mock.hits_async().await, 1);
}

#[tokio::test]
async fn missing_ro_number_is_rejected() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .get(harness.url("/api/get-inspections?shopId=6212"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Missing shopId or roNumber" }));
}

#[tokio::test]
async fn shop_without_credential_is_503() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;
    mock_no_token(&store, "9999").await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .get(harness.url("/api/get-inspections?shopId=9999&roNumber=24715"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No credential available");
    assert!(body["message"].as_str().unwrap().contains("9999"));
}

#[tokio::test]
async fn store_outage_for_unknown_shop_is_503() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;
    store
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/shop_tokens");
            then.status(500).body("db down");
        })
        .await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .get(harness.url("/api/get-inspections?shopId=6212&roNumber=24715"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn passthrough_is_verbatim() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;
    mock_token(&store, "6212", "tok-6212").await;
    let passthrough = upstream
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/customers")
                .query_param("page", "2")
                .header("authorization", "Bearer tok-6212");
            then.status(206)
                .header("content-type", "text/csv")
                .body("id,name\n1,Ada\n");
        })
        .await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .get(harness.url("/api/tm/v1/customers?shopId=6212&page=2"))
        .send()
        .await
        .unwrap();

    passthrough.assert_async().await;
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-type"], "text/csv");
    assert_eq!(resp.text().await.unwrap(), "id,name\n1,Ada\n");
}

#[tokio::test]
async fn passthrough_forwards_non_json_body() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;
    mock_token(&store, "6212", "tok-6212").await;
    let notes = upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/notes")
                .header("content-type", "text/plain")
                .body("brakes squeal");
            then.status(201).json_body(json!({ "id": 3 }));
        })
        .await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .post(harness.url("/api/tm/v1/notes?shopId=6212"))
        .header("content-type", "text/plain")
        .body("brakes squeal")
        .send()
        .await
        .unwrap();

    notes.assert_async().await;
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn health_reports_configuration() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness.client.get(harness.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["credentialStoreConfigured"], true);
    assert!(body["uptimeSeconds"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn unconfigured_store_keeps_health_up() {
    let upstream = MockServer::start_async().await;
    let config = ProxyConfig {
        upstream_base_url: upstream.base_url(),
        ..ProxyConfig::default()
    };

    let harness = Harness::start(config).await;

    let health = harness.client.get(harness.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["credentialStoreConfigured"], false);

    let resp = harness
        .client
        .post(harness.url("/api/update-inspection-item"))
        .json(&json!({ "shopId": "6212", "roId": 1, "inspectionId": 2, "taskId": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn unmatched_path_is_404() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .get(harness.url("/api/does-not-exist"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let store = MockServer::start_async().await;
    let upstream = MockServer::start_async().await;

    let harness = Harness::start(config_for(&store, &upstream)).await;
    let resp = harness
        .client
        .request(reqwest::Method::OPTIONS, harness.url("/api/update-inspection-item"))
        .header("origin", "https://tablet.example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
