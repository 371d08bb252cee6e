//! Persistent storage backed by redb.
//!
//! One database file per device holds a single `blobs` table. redb calls
//! are blocking, so every operation hops onto the Tokio blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::{StorageBackend, StorageError};

const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// A storage backend backed by a redb database file.
///
/// # Examples
///
/// ```no_run
/// # use nestly_storage::RedbBackend;
/// let backend = RedbBackend::open("/home/me/.local/share/nestly/nestly.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbBackend {
    /// Open or create a redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or created,
    /// or [`StorageError::Transaction`] if the table cannot be initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Opening the table inside a write transaction creates it.
        let txn = db.begin_write().map_err(transaction_error)?;
        txn.open_table(BLOBS).map_err(transaction_error)?;
        txn.commit().map_err(transaction_error)?;

        debug!(path = %path.display(), "opened redb storage");
        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Return the filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::Transaction {
                reason: format!("blocking task failed: {e}"),
            })?
    }
}

fn transaction_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(transaction_error)?;
            let table = txn.open_table(BLOBS).map_err(transaction_error)?;
            let value = table.get(key.as_str()).map_err(|e| StorageError::Read {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            Ok(value.map(|v| v.value().to_vec()))
        })
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let key = key.to_owned();
        let value = value.to_vec();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(transaction_error)?;
            {
                let mut table = txn.open_table(BLOBS).map_err(transaction_error)?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| StorageError::Write {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(transaction_error)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(transaction_error)?;
            {
                let mut table = txn.open_table(BLOBS).map_err(transaction_error)?;
                table
                    .remove(key.as_str())
                    .map_err(|e| StorageError::Delete {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(transaction_error)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("nestly.redb")).unwrap();

        assert_eq!(backend.get("nestly_history").await.unwrap(), None);
        backend.put("nestly_history", b"[]").await.unwrap();
        assert_eq!(
            backend.get("nestly_history").await.unwrap(),
            Some(b"[]".to_vec())
        );
        backend.delete("nestly_history").await.unwrap();
        assert!(!backend.exists("nestly_history").await.unwrap());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nestly.redb");
        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.put("key", b"persisted").await.unwrap();
        }
        let reopened = RedbBackend::open(&path).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(
            reopened.get("key").await.unwrap(),
            Some(b"persisted".to_vec())
        );
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("nestly.redb")).unwrap();
        backend.delete("nope").await.unwrap();
    }
}
