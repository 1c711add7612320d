//! Persistence of the node configuration.
//!
//! The bridge keeps exactly one durable value: the current [`NodeConfig`].
//! It lives in an opaque [`KeyValueStore`] under [`NODE_CONFIG_KEY`] as JSON.
//! [`ConfigManager`] layers the config contract on top of any store:
//!
//! - `save` overwrites atomically (no partial write is observable)
//! - `load` returns `None` when nothing was saved *or* the stored bytes do not
//!   parse; it never surfaces an error
//! - `clear` is idempotent
//! - `exists` checks presence without deserializing

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::{NodeConfig, StoreError};

/// Key the node configuration is stored under.
pub const NODE_CONFIG_KEY: &str = "node_config";

/// Opaque byte store keyed by a logical name.
///
/// Implementations must make `put` atomic from a reader's point of view.
pub trait KeyValueStore: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> bool;
}

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;

        let path = self.path_for(key);
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %path.display(), bytes = value.len(), "Wrote store entry");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }
}

/// In-process store, useful for tests and for hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.lock().map(|e| e.contains_key(key)).unwrap_or(false)
    }
}

/// Saves, loads and clears the node configuration.
#[derive(Debug)]
pub struct ConfigManager<S> {
    store: S,
}

impl<S: KeyValueStore> ConfigManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `config`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if encoding or the backing store fails.
    pub fn save(&self, config: &NodeConfig) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(config)?;
        self.store.put(NODE_CONFIG_KEY, &bytes)?;
        info!(peer_id = %config.peer_id(), "Saved node configuration");
        Ok(())
    }

    /// The last saved configuration, if any.
    ///
    /// Store failures, unparsable JSON and values that fail validation are all
    /// reported as `None` and logged.
    pub fn load(&self) -> Option<NodeConfig> {
        let bytes = match self.store.get(NODE_CONFIG_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored node configuration");
                return None;
            }
        };

        let config: NodeConfig = match serde_json::from_slice(&bytes) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Stored node configuration does not parse, treating as absent");
                return None;
            }
        };

        if let Err(e) = config.validate() {
            warn!(error = %e, "Stored node configuration is invalid, treating as absent");
            return None;
        }

        Some(config)
    }

    /// Remove the stored configuration. Clearing when absent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(NODE_CONFIG_KEY)?;
        info!("Cleared node configuration");
        Ok(())
    }

    /// Whether a value is stored, without parsing it.
    pub fn exists(&self) -> bool {
        self.store.contains(NODE_CONFIG_KEY)
    }
}

impl ConfigManager<FileStore> {
    /// File-backed manager rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(dir))
    }
}
