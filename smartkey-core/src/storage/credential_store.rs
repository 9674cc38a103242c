//! Persistence of the single enrolled passkey.

use std::sync::Arc;

use super::{
    error::{StorageError, StorageResult},
    traits::KeyValueStore,
};
use crate::credential::{PasskeyCredential, PasskeyRecord};

/// Key the passkey record is stored under.
pub const PASSKEY_STORE_KEY: &str = "smartkey.passkey";

/// Loads and saves the active user's passkey record.
///
/// Absence of the record means no passkey is enrolled. A record that exists but
/// does not parse is reported as [`StorageError::CorruptedRecord`] rather than
/// being treated as absent, so a damaged store never silently triggers a second
/// enrollment.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Wraps a platform key-value store.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Loads the stored passkey, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored record is corrupted.
    pub fn load(&self) -> StorageResult<Option<Arc<PasskeyCredential>>> {
        let Some(json) = self.backend.get(PASSKEY_STORE_KEY.to_string())? else {
            return Ok(None);
        };
        let record: PasskeyRecord = serde_json::from_str(&json)
            .map_err(|e| StorageError::CorruptedRecord(e.to_string()))?;
        let credential = PasskeyCredential::try_from(&record)
            .map_err(|e| StorageError::CorruptedRecord(e.to_string()))?;
        Ok(Some(Arc::new(credential)))
    }

    /// Persists `credential`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save(&self, credential: &PasskeyCredential) -> StorageResult<()> {
        let json = serde_json::to_string(&credential.to_record())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(PASSKEY_STORE_KEY.to_string(), json)?;
        log::debug!("stored passkey {}", credential.credential_id());
        Ok(())
    }

    /// Removes the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(PASSKEY_STORE_KEY.to_string())
    }
}
