//! Filesystem-backed key-value store for native hosts.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use super::{
    error::{StorageError, StorageResult},
    traits::KeyValueStore,
};

const TMP_SUFFIX: &str = ".tmp";

/// A [`KeyValueStore`] that keeps one file per key under a root directory.
///
/// Writes go to `{key}.tmp`, are synced, and then renamed over the target so a
/// crash leaves either the old or the new value on disk.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::Backend(format!("create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StorageError::Backend(format!("invalid key: {key:?}")));
        }
        Ok(self.root.join(key))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: String) -> StorageResult<Option<String>> {
        let path = self.path_for(&key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Backend(format!("read {key}: {e}"))),
        }
    }

    fn set(&self, key: String, value: String) -> StorageResult<()> {
        let path = self.path_for(&key)?;
        let tmp = self.root.join(format!("{key}{TMP_SUFFIX}"));
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StorageError::Backend(format!("write {key}: {e}"))
        })
    }

    fn remove(&self, key: String) -> StorageResult<()> {
        let path = self.path_for(&key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(format!("remove {key}: {e}"))),
        }
    }
}
