//! Session persistence.
//!
//! [`SessionStore`] saves, loads and deletes [`Session`]s through a pluggable
//! [`StorageAdapter`]. Any key-value backend that can store strings with an
//! optional TTL can implement the adapter; [`MemoryStorage`] is provided for
//! tests and single-process deployments.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fdk_extension::{AccessMode, MemoryStorage, Session, SessionStore, Tenant};
//!
//! # tokio_test::block_on(async {
//! let store = SessionStore::new(Arc::new(MemoryStorage::new()));
//! let session = Session::new(
//!     "abc".to_string(),
//!     &Tenant::Company("1".to_string()),
//!     AccessMode::Online,
//!     "api-key".to_string(),
//! );
//!
//! store.save(&session).await.unwrap();
//! assert!(store.get("abc").await.unwrap().is_some());
//!
//! store.delete("abc").await.unwrap();
//! assert!(store.get("abc").await.unwrap().is_none());
//! # });
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;

use crate::auth::Session;
use crate::BoxFuture;

/// Errors raised by storage adapters and session (de)serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage backend failed.
    #[error("Storage backend error: {message}")]
    Backend {
        /// Backend-provided description of the failure.
        message: String,
    },

    /// A stored session could not be encoded or decoded.
    #[error("Failed to (de)serialize session: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Verify StorageError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StorageError>();
};

/// A string key-value store with optional per-key TTL.
///
/// Implementations must be safe to share between concurrent requests.
pub trait StorageAdapter: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>>;

    /// Stores `value` under `key` without expiry.
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Stores `value` under `key`, expiring after `ttl_secs` seconds.
    fn setex<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Removes `key`. Removing an absent key is not an error.
    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory [`StorageAdapter`] backed by a concurrent hash map.
///
/// Expired entries are dropped when read and swept on every write; there is
/// no background task.
#[derive(Default)]
pub struct MemoryStorage {
    entries: DashMap<String, Entry>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Returns `true` if no live entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: &str, value: String, ttl: Option<Duration>) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let expires_at = ttl.map(|ttl| now + ttl);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl StorageAdapter for MemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        Box::pin(async move {
            let now = Instant::now();
            if let Some(entry) = self.entries.get(key) {
                if entry.is_expired(now) {
                    drop(entry);
                    self.entries.remove(key);
                    return Ok(None);
                }
                return Ok(Some(entry.value.clone()));
            }
            Ok(None)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.insert(key, value, None);
            Ok(())
        })
    }

    fn setex<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.insert(key, value, Some(Duration::from_secs(ttl_secs)));
            Ok(())
        })
    }

    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.entries.remove(key);
            Ok(())
        })
    }
}

/// Saves, loads and deletes sessions through a [`StorageAdapter`].
///
/// No retry or caching is performed; adapter failures propagate to the caller.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn StorageAdapter>,
}

impl SessionStore {
    /// Creates a store over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Persists `session` under its id.
    ///
    /// When the session has an `expires` instant the TTL is the number of
    /// whole seconds until then, clamped at zero, and `setex` is used.
    /// Sessions without an expiry are stored with `set`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the adapter fails.
    pub async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let value = serde_json::to_string(session)?;
        match session.expires {
            Some(expires) => {
                let ttl = u64::try_from((expires - Utc::now()).num_seconds()).unwrap_or(0);
                self.storage.setex(&session.id, value, ttl).await
            }
            None => self.storage.set(&session.id, value).await,
        }
    }

    /// Loads the session stored under `id`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the adapter fails or the stored value is
    /// not a valid session.
    pub async fn get(&self, id: &str) -> Result<Option<Session>, StorageError> {
        match self.storage.get(id).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Removes the session stored under `id`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the adapter fails.
    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.storage.del(id).await
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
