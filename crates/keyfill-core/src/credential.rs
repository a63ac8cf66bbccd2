use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored email/password pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub email: String,
    pub password: String,
    /// Unix epoch milliseconds
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// Ordered credentials, newest last
pub type CredentialList = Vec<CredentialRecord>;

impl CredentialRecord {
    /// Creation time as a UTC datetime, if the stored timestamp is in range
    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

// Never print the password, even in debug logs.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}
