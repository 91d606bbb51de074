//! Durable string key/value storage for the login session.
//!
//! The session manager needs exactly three operations: get, set, remove.
//! There is no transaction across keys, so a crash between two writes can
//! leave a partial session behind. [`PersistedSession`](crate::PersistedSession)
//! is written to tolerate that.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use ualkit_types::{Codec, JsonCodec};

use crate::StoreError;

/// A string-keyed, string-valued persistent store.
///
/// Async so backends can do real I/O (files, platform keychains). Each
/// call is one suspension point for the session manager.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// An in-process store. Nothing survives a restart; useful for tests and
/// for apps that deliberately never remember a login.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: parking_lot::Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: parking_lot::Mutex::new(entries),
        }
    }

    /// Synchronous read, for assertions and diagnostics.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// A store backed by a single file, encoded with a [`Codec`] (JSON by
/// default).
///
/// The whole map is cached in memory and rewritten on every change. Writes
/// go to a sibling temp file first and are then renamed over the target, so
/// a crash mid-write leaves the previous file intact.
///
/// The cache lives behind a Tokio mutex because it is held across the file
/// write: two concurrent `set`s must not interleave their renames.
#[derive(Debug)]
pub struct FileSessionStore<C: Codec = JsonCodec> {
    path: PathBuf,
    codec: C,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore<JsonCodec> {
    /// Opens (or lazily creates) a JSON session file at `path`.
    ///
    /// # Errors
    /// - [`StoreError::Io`] if the file exists but can't be read.
    /// - [`StoreError::Codec`] if the file isn't a JSON string map.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_codec(path, JsonCodec).await
    }
}

impl<C: Codec> FileSessionStore<C> {
    /// Opens a session file using a custom codec.
    pub async fn open_with_codec(path: impl AsRef<Path>, codec: C) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => codec.decode(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "session file opened");

        Ok(Self {
            path,
            codec,
            entries: Mutex::new(entries),
        })
    }

    /// The file this store writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let bytes = self.codec.encode(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl<C: Codec> SessionStore for FileSessionStore<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_get_absent_returns_none() {
        let store = MemorySessionStore::new();

        assert_eq!(store.get("missing").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_set_overwrites_previous_value() {
        let store = MemorySessionStore::new();
        store.set("k", "one").await.unwrap();

        store.set("k", "two").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_remove_absent_is_ok() {
        let store = MemorySessionStore::with_entries([("a", "1")]);

        store.remove("b").await.expect("removing a missing key is fine");

        assert_eq!(store.peek("a").as_deref(), Some("1"));
    }
}
