//! Platform interface for persistent storage.

use super::error::StorageResult;

/// Small persistent string store keyed by fixed names.
///
/// This mirrors the platform "async storage" primitives mobile and web hosts
/// already have. Writes must replace the whole value; a reader never observes a
/// partially written value.
#[uniffi::export(with_foreign)]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: String) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, key: String, value: String) -> StorageResult<()>;

    /// Removes the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn remove(&self, key: String) -> StorageResult<()>;
}
