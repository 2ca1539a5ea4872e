//! Persisted key/value state.
//!
//! [`Storage`] is the raw "get/set bytes by key" capability. [`Store`] layers
//! JSON and the read-fallback / best-effort-write contract on top of it, and
//! [`Slot`] is a stateful binding to one typed key: it keeps the current value
//! in memory and persists every update before adopting it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::model::{SortMode, Stream, UserPreferences};

/// Backend capability: raw bytes by key.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Volatile storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        self.entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// A named persisted slot holding a `T`.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> std::fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

/// Every persisted key of the dashboard.
pub mod keys {
    use super::*;

    pub const PREFERENCES: Key<UserPreferences> = Key::new("livemerge.preferences");
    pub const STREAMS: Key<Vec<Stream>> = Key::new("livemerge.streams");
    pub const CHANNELS: Key<Vec<String>> = Key::new("livemerge.channels");
    pub const CUSTOM_SORT_ORDER: Key<Vec<String>> = Key::new("livemerge.customSortOrder");
    pub const SORT_MODE: Key<SortMode> = Key::new("livemerge.sortMode");
    pub const USER_TOKEN: Key<Option<String>> = Key::new("livemerge.userToken");
    /// Milliseconds since the Unix epoch.
    pub const TOKEN_EXPIRE_DATE: Key<Option<i64>> = Key::new("livemerge.tokenExpireDate");
}

/// JSON store over an injected [`Storage`].
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Storage>,
}

impl Store {
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStorage::new(dir)))
    }

    /// Read `key`, falling back when the value is absent, empty, unreadable
    /// or does not parse.
    pub fn read<T: DeserializeOwned>(&self, key: Key<T>, fallback: T) -> T {
        let bytes = match self.backend.get(key.name()) {
            Ok(Some(bytes)) if !bytes.is_empty() => bytes,
            Ok(_) => return fallback,
            Err(e) => {
                warn!("store: failed to read {}: {}", key.name(), e);
                return fallback;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                debug!("store: discarding corrupt value for {}: {}", key.name(), e);
                fallback
            }
        }
    }

    /// Serialize and persist `value`. Failures are logged, never returned.
    pub fn write<T: Serialize>(&self, key: Key<T>, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("store: failed to serialize {}: {}", key.name(), e);
                return;
            }
        };
        if let Err(e) = self.backend.set(key.name(), &bytes) {
            warn!("store: failed to persist {}: {}", key.name(), e);
        }
    }

    /// Open a stateful binding to `key`, initialised from storage.
    pub fn slot<T>(&self, key: Key<T>, fallback: T) -> Slot<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let value = self.read(key, fallback);
        Slot {
            store: self.clone(),
            key,
            value,
        }
    }
}

/// In-memory value of one key, kept in sync with storage.
pub struct Slot<T> {
    store: Store,
    key: Key<T>,
    value: T,
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn key(&self) -> Key<T> {
        self.key
    }

    /// Replace the value. Persisted first, then adopted.
    pub fn set(&mut self, value: T) {
        self.store.write(self.key, &value);
        self.value = value;
    }

    /// Compute the next value from the previous one, then [`set`](Self::set) it.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value);
        self.set(next);
    }
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    /// Like [`update`](Self::update), but skips the write when nothing changed.
    /// Returns whether the value changed.
    pub fn update_if_changed(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.value);
        if next == self.value {
            return false;
        }
        self.set(next);
        true
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
