//! Size-limited front door to a share store.

use std::sync::Arc;

use playground_core::obs;
use playground_core::DEFAULT_MAX_SHARE_BYTES;
use tracing::debug;

use crate::error::{ShareError, ShareResult};
use crate::storage_traits::{ShareId, ShareRecord, ShareStore};

/// Applies the payload ceiling before anything reaches the store.
#[derive(Clone)]
pub struct ShareService {
    store: Arc<dyn ShareStore>,
    max_bytes: usize,
}

impl ShareService {
    pub fn new(store: Arc<dyn ShareStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    /// A service with the default ceiling.
    pub fn with_default_limit(store: Arc<dyn ShareStore>) -> Self {
        Self::new(store, DEFAULT_MAX_SHARE_BYTES)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Reject `record` if its serialized form is over the ceiling.
    pub fn check_size(&self, record: &ShareRecord) -> ShareResult<usize> {
        let size = record.serialized_len()?;
        if size > self.max_bytes {
            return Err(ShareError::PayloadTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(size)
    }

    pub async fn put(&self, record: &ShareRecord) -> ShareResult<ShareId> {
        let size = match self.check_size(record) {
            Ok(size) => size,
            Err(e) => {
                if let ShareError::PayloadTooLarge { size, .. } = &e {
                    obs::emit_share_rejected("payload_too_large", *size);
                }
                return Err(e);
            }
        };

        let id = self.store.put(record).await?;
        obs::emit_share_stored(id.as_str(), size);
        Ok(id)
    }

    pub async fn put_code(&self, code: impl Into<String>) -> ShareResult<ShareId> {
        self.put(&ShareRecord::new(code)).await
    }

    pub async fn get(&self, id: &ShareId) -> ShareResult<ShareRecord> {
        debug!(id = %id, "fetching shared template");
        self.store.get(id).await
    }

    /// Parse `raw` as an id, then fetch it.
    pub async fn get_str(&self, raw: &str) -> ShareResult<ShareRecord> {
        let id: ShareId = raw.parse()?;
        self.get(&id).await
    }
}
