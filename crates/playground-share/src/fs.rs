//! Filesystem share store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::error::{ShareError, ShareResult};
use crate::storage_traits::{ShareId, ShareRecord, ShareStore, StoredShare};

/// Filesystem-backed share store with 2-char sharding.
///
/// Layout: `<root>/shares/<first 2 id chars>/<id>.json`
#[derive(Debug, Clone)]
pub struct FsShareStore {
    shares_dir: Arc<PathBuf>,
}

impl FsShareStore {
    /// Create a store rooted at `root`. Creates `root/shares/` if needed.
    pub fn new(root: impl AsRef<Path>) -> ShareResult<Self> {
        let shares_dir = root.as_ref().join("shares");
        fs::create_dir_all(&shares_dir)?;
        Ok(Self {
            shares_dir: Arc::new(shares_dir),
        })
    }

    fn share_path(shares_dir: &Path, id: &ShareId) -> PathBuf {
        shares_dir
            .join(id.shard())
            .join(format!("{}.json", id.as_str()))
    }

    fn put_blocking(shares_dir: &Path, record: &ShareRecord) -> ShareResult<ShareId> {
        let mut last = record.id();
        for id in record.candidate_ids() {
            match Self::read_blocking(shares_dir, &id)? {
                Some(existing) if existing.code == record.code => return Ok(id),
                Some(_) => last = id,
                None => return Self::write_blocking(shares_dir, &id, record),
            }
        }
        Err(ShareError::IdCollision {
            id: last.to_string(),
        })
    }

    fn write_blocking(
        shares_dir: &Path,
        id: &ShareId,
        record: &ShareRecord,
    ) -> ShareResult<ShareId> {
        let path = Self::share_path(shares_dir, id);
        let shard_dir = shares_dir.join(id.shard());
        fs::create_dir_all(&shard_dir)?;

        // Write to a temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&shard_dir)?;
        serde_json::to_writer(&mut tmp, &StoredShare::new(record))?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(id.clone())
    }

    /// The share stored under `id`, or `None` when there is none.
    fn read_blocking(shares_dir: &Path, id: &ShareId) -> ShareResult<Option<StoredShare>> {
        let path = Self::share_path(shares_dir, id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShareError::Io(e)),
        }
    }

    fn get_blocking(shares_dir: &Path, id: &ShareId) -> ShareResult<ShareRecord> {
        Self::read_blocking(shares_dir, id)?
            .map(|stored| stored.record())
            .ok_or_else(|| ShareError::NotFound { id: id.to_string() })
    }

    async fn blocking<T, F>(&self, f: F) -> ShareResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> ShareResult<T> + Send + 'static,
    {
        let dir = Arc::clone(&self.shares_dir);
        tokio::task::spawn_blocking(move || f(&dir))
            .await
            .map_err(|e| ShareError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl ShareStore for FsShareStore {
    async fn put(&self, record: &ShareRecord) -> ShareResult<ShareId> {
        let record = record.clone();
        self.blocking(move |dir| Self::put_blocking(dir, &record)).await
    }

    async fn get(&self, id: &ShareId) -> ShareResult<ShareRecord> {
        let id = id.clone();
        self.blocking(move |dir| Self::get_blocking(dir, &id)).await
    }

    async fn contains(&self, id: &ShareId) -> ShareResult<bool> {
        let id = id.clone();
        self.blocking(move |dir| Ok(Self::share_path(dir, &id).exists()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, FsShareStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsShareStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn share_roundtrip() {
        let (_dir, store) = make_store();
        let record = ShareRecord::new("variable \"region\" {}");
        let id = store.put(&record).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn dedupe_invariant() {
        let (dir, store) = make_store();
        let record = ShareRecord::new("duplicate me");
        let a = store.put(&record).await.unwrap();
        let b = store.put(&record).await.unwrap();
        assert_eq!(a, b);

        let shard = dir.path().join("shares").join(a.shard());
        let entries: Vec<_> = std::fs::read_dir(shard).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_dir, store) = make_store();
        let id = ShareId::for_code("never stored");
        match store.get(&id).await {
            Err(ShareError::NotFound { id: missing }) => assert_eq!(missing, id.as_str()),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(!store.contains(&id).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_is_serialization_error() {
        let (dir, store) = make_store();
        let id = ShareId::for_code("corrupt");
        let shard = dir.path().join("shares").join(id.shard());
        std::fs::create_dir_all(&shard).unwrap();
        std::fs::write(shard.join(format!("{id}.json")), b"{oops").unwrap();

        assert!(matches!(
            store.get(&id).await,
            Err(ShareError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn occupied_id_steps_to_salted_id() {
        let (dir, store) = make_store();
        let record = ShareRecord::new("mine");
        let taken = record.id();
        let shard = dir.path().join("shares").join(taken.shard());
        std::fs::create_dir_all(&shard).unwrap();
        let other = StoredShare::new(&ShareRecord::new("someone else's"));
        std::fs::write(
            shard.join(format!("{taken}.json")),
            serde_json::to_vec(&other).unwrap(),
        )
        .unwrap();

        let id = store.put(&record).await.unwrap();
        assert_eq!(id, ShareId::for_code_attempt("mine", 1));
        assert_eq!(store.get(&id).await.unwrap(), record);
        assert_eq!(store.get(&taken).await.unwrap().code, "someone else's");

        // Storing the same code again walks to the same id.
        assert_eq!(store.put(&record).await.unwrap(), id);
    }

    #[tokio::test]
    async fn contains_runs_off_the_executor() {
        let (_dir, store) = make_store();
        let id = store.put(&ShareRecord::new("here")).await.unwrap();
        assert!(store.contains(&id).await.unwrap());
        assert!(!store.contains(&ShareId::for_code("absent")).await.unwrap());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FsShareStore::new(dir.path()).unwrap();
            store.put(&ShareRecord::new("persist")).await.unwrap()
        };
        let reopened = FsShareStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get(&id).await.unwrap().code, "persist");
    }
}
