use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::provider::{ShareCodeProvider, ShareError};
use super::ShareRecord;

/// In-memory share code provider
#[derive(Debug, Clone, Default)]
pub struct MemoryShareCodeProvider {
    inner: Arc<Mutex<MemoryShareCodeProviderInner>>,
}

#[derive(Debug, Default)]
struct MemoryShareCodeProviderInner {
    records: HashMap<u64, ShareRecord>,
    /// (volume, path) -> id
    index: HashMap<(String, String), u64>,
    last_id: u64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryShareCodeProviderError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

impl MemoryShareCodeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ShareCodeProvider for MemoryShareCodeProvider {
    type Error = MemoryShareCodeProviderError;

    async fn get_or_create(
        &self,
        volume: &str,
        path: &str,
        expires_at: OffsetDateTime,
    ) -> Result<ShareRecord, ShareError<Self::Error>> {
        // The whole check-then-insert runs under one lock
        let mut inner = self.inner.lock();
        let key = (volume.to_string(), path.to_string());

        if let Some(id) = inner.index.get(&key) {
            return inner.records.get(id).cloned().ok_or_else(|| {
                ShareError::Provider(MemoryShareCodeProviderError::Internal(format!(
                    "index points at missing record {}",
                    id
                )))
            });
        }

        inner.last_id += 1;
        let record = ShareRecord {
            id: inner.last_id,
            volume: key.0.clone(),
            path: key.1.clone(),
            expires_at,
        };
        inner.index.insert(key, record.id);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: u64) -> Result<Option<ShareRecord>, ShareError<Self::Error>> {
        Ok(self.inner.lock().records.get(&id).cloned())
    }

    async fn set_expiry(
        &self,
        id: u64,
        expires_at: OffsetDateTime,
    ) -> Result<(), ShareError<Self::Error>> {
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&id).ok_or(ShareError::NotFound)?;
        record.expires_at = expires_at;
        Ok(())
    }
}
