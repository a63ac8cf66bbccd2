use super::{StorageBackend, StorageMap};
use crate::{Error, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Storage kept in a single JSON object file
///
/// Writes are staged in a temporary file next to the target and renamed over
/// it, so readers only ever see a complete previous or complete new file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<StorageMap> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_file(&path))
            .await
            .map_err(|e| Error::StorageUnavailable(format!("storage read task failed: {}", e)))?
    }
}

#[async_trait]
impl StorageBackend for JsonFileStorage {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap> {
        let mut items = self.read_all().await?;
        items.retain(|key, _| keys.contains(&key.as_str()));
        Ok(items)
    }

    async fn set(&self, items: StorageMap) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut current = self.read_all().await?;
        current.extend(items);

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_file(&path, &current))
            .await
            .map_err(|e| Error::StorageUnavailable(format!("storage write task failed: {}", e)))?
    }
}

fn read_file(path: &Path) -> Result<StorageMap> {
    if !path.exists() {
        tracing::debug!("Storage file {} does not exist yet", path.display());
        return Ok(StorageMap::new());
    }

    let file = File::open(path).map_err(|e| {
        Error::StorageUnavailable(format!("cannot open {}: {}", path.display(), e))
    })?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::Corrupted(format!("{} is not a JSON object: {}", path.display(), e)))
}

fn write_file(path: &Path, items: &StorageMap) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir).map_err(|e| {
        Error::StorageUnavailable(format!("cannot create {}: {}", dir.display(), e))
    })?;

    let unavailable =
        |e: std::io::Error| Error::StorageUnavailable(format!("cannot write {}: {}", path.display(), e));

    let temp = tempfile::NamedTempFile::new_in(&dir).map_err(unavailable)?;
    write_items(BufWriter::new(temp.as_file()), items).map_err(unavailable)?;
    temp.as_file().sync_all().map_err(unavailable)?;
    temp.persist(path).map_err(|e| unavailable(e.error))?;

    tracing::debug!("Wrote {} storage key(s) to {}", items.len(), path.display());
    Ok(())
}

// Disk errors can surface while serde_json flushes mid-document, so they are
// reported as I/O failures rather than serialization failures.
fn write_items<W: Write>(mut writer: W, items: &StorageMap) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, items).map_err(std::io::Error::from)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("missing.json"));

        let items = storage.get(&["credentials"]).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join("store.json"));

        let mut items = StorageMap::new();
        items.insert("credentials".to_string(), json!([{"id": "1"}]));
        items.insert("other".to_string(), json!(true));
        storage.set(items).await.unwrap();

        let read = storage.get(&["credentials"]).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read["credentials"], json!([{"id": "1"}]));
    }

    #[tokio::test]
    async fn test_set_preserves_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        let mut first = StorageMap::new();
        first.insert("settings".to_string(), json!({"theme": "dark"}));
        storage.set(first).await.unwrap();

        let mut second = StorageMap::new();
        second.insert("credentials".to_string(), json!([]));
        storage.set(second).await.unwrap();

        let read = storage.get(&["settings", "credentials"]).await.unwrap();
        assert_eq!(read["settings"], json!({"theme": "dark"}));
        assert_eq!(read["credentials"], json!([]));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        let mut items = StorageMap::new();
        items.insert("credentials".to_string(), json!([]));
        storage.set(items.clone()).await.unwrap();
        storage.set(items).await.unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_error_during_serialization_stays_io() {
        let mut items = StorageMap::new();
        items.insert("credentials".to_string(), json!([{"id": "1"}]));

        let err = write_items(FullDisk, &items).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
        assert_eq!(err.to_string(), "no space left on device");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_unwritable_directory_is_unavailable() {
        let storage = JsonFileStorage::new("/proc/keyfill-test/store.json");
        let mut items = StorageMap::new();
        items.insert("credentials".to_string(), json!([]));

        assert!(matches!(
            storage.set(items).await,
            Err(Error::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_file_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let storage = JsonFileStorage::new(path);
        assert!(matches!(
            storage.get(&["credentials"]).await,
            Err(Error::Corrupted(_))
        ));
    }
}
