//! In-memory share store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ShareError, ShareResult};
use crate::storage_traits::{ShareId, ShareRecord, ShareStore, StoredShare};

/// Share store backed by a `HashMap<id, share>`. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryShareStore {
    store: Mutex<HashMap<ShareId, StoredShare>>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> ShareResult<std::sync::MutexGuard<'_, HashMap<ShareId, StoredShare>>> {
        self.store
            .lock()
            .map_err(|_| ShareError::Io(std::io::Error::other("share store lock poisoned")))
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn put(&self, record: &ShareRecord) -> ShareResult<ShareId> {
        let mut store = self.lock()?;
        let mut last = record.id();
        for id in record.candidate_ids() {
            match store.get(&id) {
                Some(existing) if existing.code == record.code => return Ok(id),
                Some(_) => last = id,
                None => {
                    store.insert(id.clone(), StoredShare::new(record));
                    return Ok(id);
                }
            }
        }
        Err(ShareError::IdCollision {
            id: last.to_string(),
        })
    }

    async fn get(&self, id: &ShareId) -> ShareResult<ShareRecord> {
        let store = self.lock()?;
        store
            .get(id)
            .map(StoredShare::record)
            .ok_or_else(|| ShareError::NotFound {
                id: id.to_string(),
            })
    }

    async fn contains(&self, id: &ShareId) -> ShareResult<bool> {
        Ok(self.lock()?.contains_key(id))
    }
}
