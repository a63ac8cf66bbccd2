use crate::storage::{StorageBackend, StorageMap};
use crate::{CredentialList, CredentialRecord, Error, IdGenerator, Result};

/// Storage key holding the whole credential list
pub const CREDENTIALS_KEY: &str = "credentials";

/// Credential list persisted through a [`StorageBackend`]
///
/// The store keeps an in-memory mirror of the list. The mirror only changes
/// after the backend has confirmed a write (or on `load`), so it always equals
/// the last list the backend accepted. Every mutation rewrites the whole list
/// under [`CREDENTIALS_KEY`]; two stores sharing a backend follow
/// last-writer-wins.
pub struct CredentialStore<B> {
    backend: B,
    credentials: CredentialList,
    ids: IdGenerator,
}

impl<B: StorageBackend> CredentialStore<B> {
    /// Create a store with an empty mirror. Call [`load`](Self::load) to
    /// pick up previously persisted credentials.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            credentials: Vec::new(),
            ids: IdGenerator::new(),
        }
    }

    /// Create a store and load its persisted credentials
    pub async fn open(backend: B) -> Result<Self> {
        let mut store = Self::new(backend);
        store.load().await?;
        Ok(store)
    }

    /// Read the persisted list, replacing the in-memory mirror
    pub async fn load(&mut self) -> Result<&[CredentialRecord]> {
        let mut items = self.backend.get(&[CREDENTIALS_KEY]).await?;

        let credentials: CredentialList = match items.remove(CREDENTIALS_KEY) {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::Corrupted(format!("invalid credential list: {}", e)))?,
        };

        tracing::debug!("Loaded {} credential(s)", credentials.len());
        self.credentials = credentials;
        Ok(&self.credentials)
    }

    /// Validate, append and persist a new credential
    pub async fn add(&mut self, email: &str, password: &str) -> Result<CredentialRecord> {
        if email.is_empty() {
            return Err(Error::Validation("email is required".to_string()));
        }
        if password.is_empty() {
            return Err(Error::Validation("password is required".to_string()));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let created_at = self
            .credentials
            .last()
            .map_or(now, |last| last.created_at.max(now));

        let record = CredentialRecord {
            id: self.ids.generate_at(now, &self.credentials),
            email: email.to_string(),
            password: password.to_string(),
            created_at,
        };

        let mut updated = self.credentials.clone();
        updated.push(record.clone());
        self.persist(updated).await?;

        tracing::info!("Saved credential {} for {}", record.id, record.email);
        Ok(record)
    }

    /// Remove the credential with `id`, returning it if it was present
    ///
    /// An unknown id is not an error and issues no write.
    pub async fn remove(&mut self, id: &str) -> Result<Option<CredentialRecord>> {
        let Some(position) = self.credentials.iter().position(|record| record.id == id) else {
            tracing::debug!("Credential {} not found, nothing to remove", id);
            return Ok(None);
        };

        let mut updated = self.credentials.clone();
        let removed = updated.remove(position);
        self.persist(updated).await?;

        tracing::info!("Removed credential {}", id);
        Ok(Some(removed))
    }

    /// Look up a credential by id
    pub fn get(&self, id: &str) -> Option<&CredentialRecord> {
        self.credentials.iter().find(|record| record.id == id)
    }

    /// Credentials in insertion order, newest last
    pub fn credentials(&self) -> &[CredentialRecord] {
        &self.credentials
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn persist(&mut self, updated: CredentialList) -> Result<()> {
        let mut items = StorageMap::new();
        items.insert(CREDENTIALS_KEY.to_string(), serde_json::to_value(&updated)?);

        if let Err(e) = self.backend.set(items).await {
            tracing::warn!("Credential write failed, keeping previous list: {}", e);
            return Err(e);
        }

        self.credentials = updated;
        Ok(())
    }
}
