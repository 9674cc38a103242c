//! Credential storage: the passkey record and the platform key-value port it lives in.

mod credential_store;
mod error;
mod file;
mod memory;
mod traits;

pub use credential_store::{CredentialStore, PASSKEY_STORE_KEY};
pub use error::{StorageError, StorageResult};
pub use file::FileKeyValueStore;
pub use memory::InMemoryKeyValueStore;
pub use traits::KeyValueStore;
