//! In-memory [`CredentialStore`] for tests and local development.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CredentialRecord, CredentialStore, StoreError};

/// Cloning shares the same records, so a test can keep a handle and swap
/// records while the cache owns another.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<DashMap<String, CredentialRecord>>,
    unavailable: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `record`, superseding any previous record for the same shop.
    pub fn insert(&self, record: CredentialRecord) {
        self.records.insert(record.tenant_id.clone(), record);
    }

    pub fn remove(&self, tenant_id: &str) {
        self.records.remove(tenant_id);
    }

    /// Simulates an outage: every fetch fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `fetch` calls served so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(self.records.get(tenant_id).map(|entry| entry.value().clone()))
    }
}
