//! Process-local key-value store, used by tests and ephemeral sessions.

use std::{collections::HashMap, sync::Mutex};

use super::{
    error::{StorageError, StorageResult},
    traits::KeyValueStore,
};

/// A [`KeyValueStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: String) -> StorageResult<Option<String>> {
        let guard = self
            .values
            .lock()
            .map_err(|_| StorageError::Backend("mutex poisoned".to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> StorageResult<()> {
        self.values
            .lock()
            .map_err(|_| StorageError::Backend("mutex poisoned".to_string()))?
            .insert(key, value);
        Ok(())
    }

    fn remove(&self, key: String) -> StorageResult<()> {
        self.values
            .lock()
            .map_err(|_| StorageError::Backend("mutex poisoned".to_string()))?
            .remove(&key);
        Ok(())
    }
}
