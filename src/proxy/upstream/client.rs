// Upstream client implementation
// Single-attempt forwarder with bearer injection

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::time::Duration;

/// Body of one outbound call.
#[derive(Debug, Clone)]
pub enum UpstreamBody {
    /// Serialized as JSON with `Content-Type: application/json`
    Json(Value),
    /// Sent as-is; used by the passthrough route for non-JSON payloads
    Raw { bytes: Bytes, content_type: Option<HeaderValue> },
}

/// Describes one outbound call, produced by a handler and consumed once.
#[derive(Debug, Clone)]
pub struct UpstreamCallSpec {
    /// Relative to the upstream origin; may carry a query string
    pub path: String,
    pub method: Method,
    pub body: Option<UpstreamBody>,
    pub headers: HeaderMap,
}

impl UpstreamCallSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(UpstreamBody::Json(body));
        self
    }

    pub fn with_raw_body(mut self, bytes: Bytes, content_type: Option<HeaderValue>) -> Self {
        self.body = Some(UpstreamBody::Raw { bytes, content_type });
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// What the upstream answered, uninterpreted.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(header::CONTENT_TYPE)
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as JSON when it parses, otherwise as a string. Used for error details.
    pub fn body_as_details(&self) -> Value {
        self.json()
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("credential cannot be used as a header value")]
    InvalidCredential,
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
}

impl UpstreamClient {
    /// Shared HTTP client for upstream and credential store calls.
    pub fn build_http_client(connect_timeout: Duration) -> Result<Client, UpstreamError> {
        let client = Client::builder()
            // Connection reuse; no overall timeout, in-flight calls run to completion
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("shop-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }

    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self::with_client(Self::build_http_client(connect_timeout)?, base_url))
    }

    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http_client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(base_url: &str, path: &str) -> String {
        format!("{}/{}", base_url, path.trim_start_matches('/'))
    }

    /// Issue exactly one call. A non-2xx status is a successful result; only
    /// transport failures are errors.
    pub async fn forward(
        &self,
        spec: UpstreamCallSpec,
        token: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| UpstreamError::InvalidCredential)?,
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in spec.headers.iter() {
            if name == header::AUTHORIZATION || name == header::ACCEPT {
                tracing::debug!(header = %name, "ignoring caller header that would replace an injected one");
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let url = Self::build_url(&self.base_url, &spec.path);
        let mut request = self
            .http_client
            .request(spec.method.clone(), &url)
            .headers(headers);

        request = match spec.body {
            Some(UpstreamBody::Json(body)) => request.json(&body),
            Some(UpstreamBody::Raw { bytes, content_type }) => {
                let request = match content_type {
                    Some(ct) => request.header(header::CONTENT_TYPE, ct),
                    None => request,
                };
                request.body(bytes)
            }
            None => request,
        };

        let resp = request.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        tracing::debug!(
            method = %spec.method,
            path = %spec.path,
            status = status.as_u16(),
            bytes = body.len(),
            "upstream call finished"
        );

        Ok(UpstreamResponse { status, headers, body })
    }
}
