//! Where credentials live and how they are opened.

use anyhow::{Result, anyhow};
use keyfill_core::{CredentialStore, EncryptedStorage, JsonFileStorage, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;

/// Credential store shared by every command
pub type Store = CredentialStore<Arc<dyn StorageBackend>>;

/// Resolved storage settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    passphrase: Option<String>,
    migrate_plaintext: bool,
}

impl StoreConfig {
    /// Use `path` or the default location; an empty passphrase counts as none
    pub fn resolve(path: Option<PathBuf>, passphrase: Option<String>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        Ok(Self {
            path,
            passphrase: passphrase.filter(|p| !p.is_empty()),
            migrate_plaintext: false,
        })
    }

    /// Let an encrypted store read values saved before encryption was enabled
    pub fn with_plaintext_migration(mut self, migrate: bool) -> Self {
        self.migrate_plaintext = migrate;
        self
    }

    /// `~/.keyfill/credentials.json`
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not determine home directory"))?
            .join(".keyfill")
            .join("credentials.json"))
    }

    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    /// File backend, wrapped in encryption when a passphrase is set
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        let file = JsonFileStorage::new(self.path.clone());
        match &self.passphrase {
            Some(passphrase) => Arc::new(
                EncryptedStorage::new(file, passphrase.clone())
                    .allow_plaintext(self.migrate_plaintext),
            ),
            None => Arc::new(file),
        }
    }

    /// Open the store and load its credentials
    pub async fn open_store(&self) -> Result<Store> {
        tracing::debug!(
            "Opening credential store at {} (encrypted: {})",
            self.path.display(),
            self.is_encrypted()
        );
        Ok(CredentialStore::open(self.backend()).await?)
    }
}

/// Runtime for the async store and browser operations
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let config = StoreConfig::resolve(Some(PathBuf::from("/tmp/creds.json")), None).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/creds.json"));
        assert!(!config.is_encrypted());
    }

    #[test]
    fn test_empty_passphrase_is_plaintext() {
        let config =
            StoreConfig::resolve(Some(PathBuf::from("x.json")), Some(String::new())).unwrap();
        assert!(!config.is_encrypted());
    }

    #[test]
    fn test_default_path_under_home() {
        if let Ok(path) = StoreConfig::default_path() {
            assert!(path.ends_with(".keyfill/credentials.json"));
        }
    }

    #[test]
    fn test_encrypted_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::resolve(
            Some(dir.path().join("creds.json")),
            Some("secret".to_string()),
        )
        .unwrap();

        runtime()
            .unwrap()
            .block_on(async {
                let mut store = config.open_store().await?;
                store.add("a@example.com", "pw").await?;
                let reopened = config.open_store().await?;
                assert_eq!(reopened.credentials(), store.credentials());
                anyhow::Ok(())
            })
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("creds.json")).unwrap();
        assert!(!raw.contains("a@example.com"));
    }

    #[test]
    fn test_plaintext_store_needs_migration_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let plain = StoreConfig::resolve(Some(path.clone()), None).unwrap();
        let encrypted = StoreConfig::resolve(Some(path.clone()), Some("secret".to_string())).unwrap();
        let rt = runtime().unwrap();

        rt.block_on(async {
            let mut store = plain.open_store().await?;
            store.add("a@example.com", "pw").await?;
            anyhow::Ok(())
        })
        .unwrap();

        assert!(rt.block_on(encrypted.open_store()).is_err());

        let migrating = encrypted.clone().with_plaintext_migration(true);
        let mut store = rt.block_on(migrating.open_store()).unwrap();
        assert_eq!(store.len(), 1);
        rt.block_on(store.add("b@example.com", "pw")).unwrap();

        let reopened = rt.block_on(encrypted.open_store()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("a@example.com"));
    }
}
