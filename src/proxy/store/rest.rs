//! PostgREST-style credential store client.
//!
//! Reads `{endpoint}/rest/v1/{table}` filtered by `shop_id`, newest record
//! first, with a read-only access key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;

use super::{CredentialRecord, CredentialStore, StoreError};
use crate::proxy::config::CredentialStoreConfig;

const SELECT_COLUMNS: &str = "shop_id,access_token,issued_at,expires_at";

#[derive(Debug, Deserialize)]
struct TokenRow {
    #[serde(default)]
    shop_id: Value,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl TokenRow {
    fn into_record(self, requested: &str) -> Option<CredentialRecord> {
        let token = self.access_token.filter(|t| !t.trim().is_empty())?;
        let tenant_id = match self.shop_id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => requested.to_string(),
        };
        Some(CredentialRecord {
            tenant_id,
            token,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        })
    }
}

pub struct RestCredentialStore {
    client: Client,
    endpoint: String,
    access_key: String,
    table: String,
}

impl RestCredentialStore {
    pub fn new(client: Client, config: &CredentialStoreConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
            table: config.table.clone(),
        }
    }

    fn query_url(&self, tenant_id: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("shop_id", &format!("eq.{}", tenant_id))
            .append_pair("select", SELECT_COLUMNS)
            .append_pair("order", "issued_at.desc")
            .append_pair("limit", "1")
            .finish();
        format!("{}/rest/v1/{}?{}", self.endpoint, self.table, query)
    }
}

#[async_trait]
impl CredentialStore for RestCredentialStore {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let resp = self
            .client
            .get(self.query_url(tenant_id))
            .header("apikey", &self.access_key)
            .bearer_auth(&self.access_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<TokenRow> = resp
            .json()
            .await
            .map_err(|e| StoreError::Deserialize(e.to_string()))?;

        tracing::debug!(shop_id = %tenant_id, rows = rows.len(), "credential store answered");

        // `limit=1` already asks for the newest row; pick it again in case the
        // table is exposed through a view that ignores ordering.
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_record(tenant_id))
            .max_by_key(|record| record.issued_at))
    }
}
