use super::{StorageBackend, StorageMap};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-process storage, lost when dropped
///
/// Reads and writes can be made to fail on demand, which lets callers
/// exercise their `StorageUnavailable` paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<StorageMap>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with `items`
    pub fn with_items(items: StorageMap) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// Make subsequent `get` calls fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `set` calls fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Copy of everything currently stored
    pub async fn snapshot(&self) -> StorageMap {
        self.items.lock().await.clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("memory storage read rejected".to_string()));
        }

        let items = self.items.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| items.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    async fn set(&self, items: StorageMap) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("memory storage write rejected".to_string()));
        }

        self.items.lock().await.extend(items);
        Ok(())
    }
}
