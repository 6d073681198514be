//! Share storage abstractions.
//!
//! A shared template is addressed by a short id derived from the SHA-256 of
//! its source, so storing the same source twice yields the same id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ShareError, ShareResult};

/// Number of hex characters in a share id.
pub const SHARE_ID_LEN: usize = 10;

/// How many ids a store tries for one code before giving up on collisions.
pub const MAX_ID_ATTEMPTS: u32 = 8;

/// Short content address of a shared template.
///
/// Always `SHARE_ID_LEN` lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareId(String);

impl ShareId {
    /// Derive the id of `code`.
    pub fn for_code(code: &str) -> Self {
        Self::for_code_attempt(code, 0)
    }

    /// Id of `code` on its `attempt`-th try. Attempt 0 is [`ShareId::for_code`];
    /// later attempts salt the hash so a store can step past an id already
    /// holding different code.
    pub fn for_code_attempt(code: &str, attempt: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        if attempt > 0 {
            hasher.update([0u8]);
            hasher.update(attempt.to_string().as_bytes());
        }
        let full = hex::encode(hasher.finalize());
        ShareId(full[..SHARE_ID_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory name (first two characters).
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }
}

impl TryFrom<String> for ShareId {
    type Error = ShareError;

    fn try_from(s: String) -> ShareResult<Self> {
        if s.len() != SHARE_ID_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ShareError::InvalidId(s));
        }
        Ok(ShareId(s.to_ascii_lowercase()))
    }
}

impl std::str::FromStr for ShareId {
    type Err = ShareError;

    fn from_str(s: &str) -> ShareResult<Self> {
        ShareId::try_from(s.to_string())
    }
}

impl From<ShareId> for String {
    fn from(id: ShareId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ShareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire shape of a shared template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub code: String,
}

impl ShareRecord {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn id(&self) -> ShareId {
        ShareId::for_code(&self.code)
    }

    /// Candidate ids in the order stores try them.
    pub fn candidate_ids(&self) -> impl Iterator<Item = ShareId> + '_ {
        (0..MAX_ID_ATTEMPTS).map(|attempt| ShareId::for_code_attempt(&self.code, attempt))
    }

    /// Size of the serialized record; this is what the ceiling applies to.
    pub fn serialized_len(&self) -> ShareResult<usize> {
        Ok(serde_json::to_vec(self)?.len())
    }
}

/// Reply to a successful store request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareResponse {
    pub id: ShareId,
}

/// Error body returned by the share server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// What a store keeps per id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredShare {
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl StoredShare {
    pub fn new(record: &ShareRecord) -> Self {
        Self {
            code: record.code.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn record(&self) -> ShareRecord {
        ShareRecord::new(self.code.clone())
    }
}

/// Shared template store.
///
/// Guarantees:
/// - `put(record)` returns the first of `record.candidate_ids()` that is
///   free or already holds `record.code`; normally `record.id()`.
/// - `get(put(record))` returns `record`; an id is never reused for
///   different code.
/// - `get(id)` returns the record previously stored under `id`, or
///   `ShareError::NotFound`.
/// - Storing the same code twice keeps the first `created_at`.
/// - When every candidate holds other code, `put` fails with
///   `ShareError::IdCollision`.
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn put(&self, record: &ShareRecord) -> ShareResult<ShareId>;

    async fn get(&self, id: &ShareId) -> ShareResult<ShareRecord>;

    async fn contains(&self, id: &ShareId) -> ShareResult<bool>;
}
