use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use chrono::{DateTime, Utc};

use crate::proxy::store::CredentialStore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// One cached credential. Replaced wholesale on refresh, never edited in place.
#[derive(Clone)]
struct CacheEntry {
    token: String,
    fetched_at: Instant,
    /// Copied from the store record; freshness is governed by `fetched_at`.
    expires_at: Option<DateTime<Utc>>,
}

/// What a cache entry looks like from the outside. Never carries the token.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub age: Duration,
    pub expires_at: Option<DateTime<Utc>>,
    pub fresh: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no credential available for shop {tenant_id}")]
    NotAvailable { tenant_id: String },
}

/// Per-shop token cache in front of a [`CredentialStore`].
///
/// A cached token is served without touching the store while it is younger
/// than the TTL. Past that, the store is read again. When the read fails or
/// finds nothing, a previously fetched token is still served (stale fallback)
/// and only a shop that was never fetched gets [`CredentialError::NotAvailable`].
pub struct CredentialCache {
    store: Arc<dyn CredentialStore>,
    entries: DashMap<String, CacheEntry>, // tenant_id -> entry
    /// Per-shop refresh lock so concurrent misses share one store read
    refresh_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    ttl: Duration,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self {
            store,
            entries: DashMap::new(),
            refresh_locks: DashMap::new(),
            ttl,
        }
    }

    pub fn with_default_ttl(store: Arc<dyn CredentialStore>) -> Self {
        Self::new(store, DEFAULT_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of shops with a cached credential.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, tenant_id: &str) -> Option<CacheEntryInfo> {
        self.entries.get(tenant_id).map(|entry| {
            let age = entry.fetched_at.elapsed();
            CacheEntryInfo {
                age,
                expires_at: entry.expires_at,
                fresh: age < self.ttl,
            }
        })
    }

    fn fresh_token(&self, tenant_id: &str) -> Option<String> {
        self.entries
            .get(tenant_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.token.clone())
    }

    fn refresh_lock(&self, tenant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.refresh_locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Returns the bearer token for `tenant_id`, reading the store only when
    /// the cached copy is missing or older than the TTL.
    pub async fn get_credential(&self, tenant_id: &str) -> Result<String, CredentialError> {
        if let Some(token) = self.fresh_token(tenant_id) {
            return Ok(token);
        }

        let lock = self.refresh_lock(tenant_id);
        let result = {
            let _guard = lock.lock().await;
            self.refresh(tenant_id).await
        };

        // Shop ids come from callers; an unknown one must not keep a lock
        // around. Two references left means only the map and this call.
        if result.is_err() {
            self.refresh_locks
                .remove_if(tenant_id, |_, l| Arc::strong_count(l) <= 2);
        }
        result
    }

    /// Runs with the shop's refresh lock held.
    async fn refresh(&self, tenant_id: &str) -> Result<String, CredentialError> {
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.fresh_token(tenant_id) {
            tracing::debug!(shop_id = %tenant_id, "credential refreshed by a concurrent request");
            return Ok(token);
        }

        match self.store.fetch(tenant_id).await {
            Ok(Some(record)) => {
                if record.is_expired_at(Utc::now()) {
                    tracing::warn!(
                        shop_id = %tenant_id,
                        expires_at = ?record.expires_at,
                        "credential store returned an expired token; serving it anyway"
                    );
                }
                let token = record.token.clone();
                self.entries.insert(
                    tenant_id.to_string(),
                    CacheEntry {
                        token: record.token,
                        fetched_at: Instant::now(),
                        expires_at: record.expires_at,
                    },
                );
                tracing::debug!(shop_id = %tenant_id, "credential cached");
                Ok(token)
            }
            Ok(None) => self.stale_or_unavailable(tenant_id, "no credential record found"),
            Err(e) => self.stale_or_unavailable(tenant_id, &e.to_string()),
        }
    }

    fn stale_or_unavailable(&self, tenant_id: &str, reason: &str) -> Result<String, CredentialError> {
        match self.entries.get(tenant_id) {
            Some(entry) => {
                tracing::warn!(
                    shop_id = %tenant_id,
                    age_secs = entry.fetched_at.elapsed().as_secs(),
                    reason,
                    "credential refresh failed; serving stale token"
                );
                Ok(entry.token.clone())
            }
            None => {
                tracing::warn!(shop_id = %tenant_id, reason, "no credential available");
                Err(CredentialError::NotAvailable {
                    tenant_id: tenant_id.to_string(),
                })
            }
        }
    }
}
