//! Credential Store: users and access requests persisted as JSON sequences
//! under fixed keys of a key/value store.
//!
//! Reads never fail on bad data: a missing or unparseable value is an empty
//! sequence. Writers that check-then-act must hold `CredentialStore::exclusive`
//! for the whole cycle.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::auth::models::{same_email, AccessRequest, RequestStatus, User};

pub const USERS_KEY: &str = "ats_users";
pub const REQUESTS_KEY: &str = "ats_requests";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Key/value backends
// ────────────────────────────────────────────────────────────────────────────

/// String-keyed blob storage with local-storage semantics: no transactions,
/// last write wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key under a data directory.
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.path_for(key);
        // Write-then-rename so readers never see a half-written file.
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &target).await?;
        debug!("Wrote {}", target.display());
        Ok(())
    }
}

/// Process-local backend for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Repository traits
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// All requests in arrival order.
    async fn list_requests(&self) -> Result<Vec<AccessRequest>, StoreError>;

    async fn find_request(&self, id: &str) -> Result<Option<AccessRequest>, StoreError>;

    async fn insert_request(&self, request: AccessRequest) -> Result<(), StoreError>;

    /// Sets the status of the request with `id`. Returns the updated record,
    /// or `None` if no request has that id. Other requests are untouched.
    async fn update_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<Option<AccessRequest>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// CredentialStore
// ────────────────────────────────────────────────────────────────────────────

pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
    writer: Mutex<()>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            writer: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::default()))
    }

    /// Single-writer lock. Hold it across any read-check-write sequence.
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("Stored value for '{key}' is unreadable, treating as empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        self.kv.set(key, raw).await
    }
}

#[async_trait]
impl UserRepository for CredentialStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.read_list(USERS_KEY).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .find(|u| same_email(&u.email, email)))
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.list_users().await?;
        users.push(user);
        self.write_list(USERS_KEY, &users).await
    }
}

#[async_trait]
impl RequestRepository for CredentialStore {
    async fn list_requests(&self) -> Result<Vec<AccessRequest>, StoreError> {
        self.read_list(REQUESTS_KEY).await
    }

    async fn find_request(&self, id: &str) -> Result<Option<AccessRequest>, StoreError> {
        Ok(self
            .list_requests()
            .await?
            .into_iter()
            .find(|r| r.id == id))
    }

    async fn insert_request(&self, request: AccessRequest) -> Result<(), StoreError> {
        let mut requests = self.list_requests().await?;
        requests.push(request);
        self.write_list(REQUESTS_KEY, &requests).await
    }

    async fn update_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<Option<AccessRequest>, StoreError> {
        let mut requests = self.list_requests().await?;
        let Some(target) = requests.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        target.status = status;
        let updated = target.clone();
        self.write_list(REQUESTS_KEY, &requests).await?;
        Ok(Some(updated))
    }
}
