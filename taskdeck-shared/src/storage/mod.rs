//! Durable client-side session storage
//!
//! The persisted session is two entries in a key/value store:
//!
//! | Key     | Value                         |
//! |---------|-------------------------------|
//! | `token` | opaque bearer token           |
//! | `user`  | JSON-serialized [`User`]      |
//!
//! [`KeyValueStore`] is the raw backend ([`MemoryStore`] or [`FileStore`]);
//! [`SessionStore`] is the typed view that keeps the two keys consistent.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taskdeck_shared::storage::{MemoryStore, SessionStore};
//!
//! let store = SessionStore::new(Arc::new(MemoryStore::new()));
//! assert!(store.token().unwrap().is_none());
//! store.clear().unwrap();
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;
use thiserror::Error;

use crate::models::User;

/// Storage key of the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key of the serialized user record
pub const USER_KEY: &str = "user";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal string key/value backend
///
/// Implementations must make each call atomic with respect to other calls on
/// the same instance.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, if any
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Typed access to the persisted session (token + user)
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns the persisted bearer token
    pub fn token(&self) -> StorageResult<Option<String>> {
        self.backend.get(TOKEN_KEY)
    }

    /// Returns the persisted user record
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored record is corrupt.
    pub fn user(&self) -> StorageResult<Option<User>> {
        match self.backend.get(USER_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persists token and user as a pair
    ///
    /// If the user cannot be written the token is removed again, so the pair
    /// is never left half-written.
    pub fn save(&self, token: &str, user: &User) -> StorageResult<()> {
        let raw_user = serde_json::to_string(user)?;
        self.backend.set(TOKEN_KEY, token)?;
        if let Err(err) = self.backend.set(USER_KEY, &raw_user) {
            if let Err(rollback) = self.backend.remove(TOKEN_KEY) {
                tracing::warn!(error = %rollback, "Failed to roll back token after user write failed");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Replaces the persisted user record, leaving the token alone
    pub fn save_user(&self, user: &User) -> StorageResult<()> {
        let raw_user = serde_json::to_string(user)?;
        self.backend.set(USER_KEY, &raw_user)
    }

    /// Removes token and user
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(USER_KEY)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: UserRole::User,
            created_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    /// Backend that refuses writes to the user key
    struct FailingUserWrites {
        inner: MemoryStore,
        failed: AtomicBool,
    }

    impl KeyValueStore for FailingUserWrites {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if key == USER_KEY {
                self.failed.store(true, Ordering::SeqCst);
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_save_and_load_pair() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.save("tok", &user()).unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some("tok"));
        assert_eq!(store.user().unwrap(), Some(user()));
    }

    #[test]
    fn test_clear_removes_both_and_is_idempotent() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.save("tok", &user()).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.token().unwrap().is_none());
        assert!(store.user().unwrap().is_none());
    }

    #[test]
    fn test_failed_user_write_rolls_back_token() {
        let backend = Arc::new(FailingUserWrites {
            inner: MemoryStore::new(),
            failed: AtomicBool::new(false),
        });
        let store = SessionStore::new(backend.clone());

        assert!(store.save("tok", &user()).is_err());
        assert!(backend.failed.load(Ordering::SeqCst));
        assert!(store.token().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_user_is_an_error() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(USER_KEY, "{not json").unwrap();
        let store = SessionStore::new(backend);

        assert!(matches!(store.user(), Err(StorageError::Serialization(_))));
    }
}
