//! Read-only access to the external credential store.
//!
//! The store is the system of record for per-shop bearer tokens. Another
//! process writes to it; this crate only ever reads the newest record for a
//! shop through [`CredentialStore::fetch`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;
pub mod rest;

pub use memory::MemoryCredentialStore;
pub use rest::RestCredentialStore;

/// The current credential for one shop as held by the store.
#[derive(Clone)]
pub struct CredentialRecord {
    pub tenant_id: String,
    pub token: String,
    pub issued_at: Option<DateTime<Utc>>,
    /// `None` means the expiry is unknown and the token is treated as usable.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub fn new(tenant_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            token: token.into(),
            issued_at: None,
            expires_at: None,
        }
    }

    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

// The token never shows up in logs.
impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("tenant_id", &self.tenant_id)
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("credential store returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed credential store response: {0}")]
    Deserialize(String),
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Query-by-shop interface over the credential store.
///
/// Implementations must not cache; freshness is decided by
/// [`CredentialCache`](crate::proxy::credential_cache::CredentialCache).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the newest record for `tenant_id`, or `Ok(None)` if the store
    /// holds nothing for that shop.
    async fn fetch(&self, tenant_id: &str) -> Result<Option<CredentialRecord>, StoreError>;
}
