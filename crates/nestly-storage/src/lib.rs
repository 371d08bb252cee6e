//! Device-local storage for Nestly.
//!
//! This crate defines the [`StorageBackend`] trait, a small key-value
//! interface holding opaque blobs. It knows nothing about links, documents,
//! or the recent-activity ledger; `nestly-core` decides what goes in a blob.
//!
//! Two implementations are provided:
//!
//! - [`RedbBackend`]: persistent default, backed by redb (feature `redb-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and throwaway sessions
//!
//! Storage is scoped to one device. Writes are plain overwrites, so two
//! processes writing the same key race and the last write wins.

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_backend;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;

/// A pluggable key-value storage backend.
///
/// Keys are short UTF-8 names (e.g. `nestly_history`). Values are opaque
/// byte arrays; callers own their encoding.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a value, overwriting any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists.
    ///
    /// The default implementation calls [`get`](StorageBackend::get) and checks
    /// for `Some`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}
