pub mod credential;
pub mod error;
pub mod id;
pub mod storage;
pub mod store;

pub use credential::{CredentialList, CredentialRecord};
pub use error::{Error, Result};
pub use id::IdGenerator;
pub use storage::{EncryptedStorage, JsonFileStorage, MemoryStorage, StorageBackend, StorageMap};
pub use store::{CREDENTIALS_KEY, CredentialStore};
