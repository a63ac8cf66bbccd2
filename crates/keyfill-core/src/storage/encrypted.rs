use super::{StorageBackend, StorageMap};
use crate::{Error, Result};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

const ENVELOPE_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Sealed form of one stored value
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    salt: String,
    nonce: String,
    ciphertext: String,
}

struct DerivedKey {
    salt: [u8; SALT_LEN],
    key: [u8; 32],
}

/// Encryption-at-rest wrapper around another backend
///
/// Every value is serialized to JSON and sealed with AES-256-GCM. The key is
/// derived from a passphrase with Argon2id and a random salt that travels
/// with each envelope.
///
/// Unsealed values are rejected, since anyone who can write the backing store
/// could otherwise plant them. [`allow_plaintext`](Self::allow_plaintext)
/// lets a store written before encryption was enabled be read once; its
/// values are sealed on their next write.
pub struct EncryptedStorage<B> {
    inner: B,
    passphrase: String,
    allow_plaintext: bool,
    derived: Mutex<Option<DerivedKey>>,
}

impl<B: StorageBackend> EncryptedStorage<B> {
    pub fn new(inner: B, passphrase: impl Into<String>) -> Self {
        Self {
            inner,
            passphrase: passphrase.into(),
            allow_plaintext: false,
            derived: Mutex::new(None),
        }
    }

    /// Accept unsealed values on read, for migrating a plaintext store
    pub fn allow_plaintext(mut self, allow: bool) -> Self {
        self.allow_plaintext = allow;
        self
    }

    /// The wrapped backend, which only ever sees sealed values
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn key_for_salt(&self, salt: &[u8; SALT_LEN]) -> Result<[u8; 32]> {
        let mut derived = self
            .derived
            .lock()
            .map_err(|_| Error::Crypto("key cache poisoned".to_string()))?;

        if let Some(cached) = derived.as_ref().filter(|cached| &cached.salt == salt) {
            return Ok(cached.key);
        }

        let key = derive_key(&self.passphrase, salt)?;
        *derived = Some(DerivedKey { salt: *salt, key });
        Ok(key)
    }

    /// Salt and key for new writes: reuse the cached pair or start a fresh one
    fn sealing_key(&self) -> Result<([u8; SALT_LEN], [u8; 32])> {
        let cached = self
            .derived
            .lock()
            .map_err(|_| Error::Crypto("key cache poisoned".to_string()))?
            .as_ref()
            .map(|cached| (cached.salt, cached.key));

        if let Some(pair) = cached {
            return Ok(pair);
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = self.key_for_salt(&salt)?;
        Ok((salt, key))
    }

    fn seal(&self, value: &Value) -> Result<Value> {
        let (salt, key) = self.sealing_key()?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let plaintext = serde_json::to_vec(value)?;

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| Error::Crypto(format!("encryption failed: {}", e)))?;

        let envelope = Envelope {
            v: ENVELOPE_VERSION,
            salt: STANDARD.encode(salt),
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        };
        Ok(serde_json::to_value(envelope)?)
    }

    fn open(&self, envelope: Envelope) -> Result<Value> {
        if envelope.v != ENVELOPE_VERSION {
            return Err(Error::Crypto(format!(
                "unsupported envelope version {}",
                envelope.v
            )));
        }

        let salt: [u8; SALT_LEN] = decode_field("salt", &envelope.salt)?
            .try_into()
            .map_err(|_| Error::Crypto("salt has the wrong length".to_string()))?;
        let nonce = decode_field("nonce", &envelope.nonce)?;
        if nonce.len() != NONCE_LEN {
            return Err(Error::Crypto("nonce has the wrong length".to_string()));
        }
        let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;

        let key = self.key_for_salt(&salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| {
                Error::Crypto("decryption failed: wrong passphrase or tampered data".to_string())
            })?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for EncryptedStorage<B> {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap> {
        let sealed = self.inner.get(keys).await?;
        let mut items = StorageMap::new();

        for (key, value) in sealed {
            let opened = if value.get("ciphertext").is_some() {
                let envelope: Envelope = serde_json::from_value(value)
                    .map_err(|e| Error::Crypto(format!("malformed envelope for '{}': {}", key, e)))?;
                self.open(envelope)?
            } else if !self.allow_plaintext {
                return Err(Error::Crypto(format!(
                    "storage key '{}' is not encrypted and plaintext migration is disabled",
                    key
                )));
            } else {
                tracing::warn!(
                    "Storage key '{}' is not encrypted; it will be sealed on next write",
                    key
                );
                value
            };
            items.insert(key, opened);
        }

        Ok(items)
    }

    async fn set(&self, items: StorageMap) -> Result<()> {
        let mut sealed = StorageMap::new();
        for (key, value) in &items {
            sealed.insert(key.clone(), self.seal(value)?);
        }
        self.inner.set(sealed).await
    }
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; 32]> {
    tracing::debug!("Deriving storage key");
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| Error::Crypto(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

fn decode_field(name: &str, encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::Crypto(format!("invalid {} encoding: {}", name, e)))
}
