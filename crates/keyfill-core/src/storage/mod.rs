//! Key-value storage backends for persisted extension state.
//!
//! Every backend exposes the same two asynchronous operations as the
//! browser's local storage area: `get` a set of keys and `set` (merge) a
//! mapping of keys to JSON values. Any failure surfaces as
//! [`Error::StorageUnavailable`](crate::Error::StorageUnavailable).

mod encrypted;
mod file;
mod memory;

pub use encrypted::EncryptedStorage;
pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Mapping of storage keys to JSON values
pub type StorageMap = serde_json::Map<String, serde_json::Value>;

/// Asynchronous key-value storage
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the given keys. Keys with no stored value are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<StorageMap>;

    /// Write every entry of `items`, replacing existing values for those keys
    /// and leaving other keys untouched.
    async fn set(&self, items: StorageMap) -> Result<()>;
}

#[async_trait]
impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap> {
        (**self).get(keys).await
    }

    async fn set(&self, items: StorageMap) -> Result<()> {
        (**self).set(items).await
    }
}
