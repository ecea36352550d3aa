//! Session-scoped key-value stores
//!
//! The feed cache never touches a global; it is handed a [`SessionStore`].
//! In a browser that is session storage, in tests a plain map, and in the
//! CLI a JSON file that lives as long as the user's session.

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// String key-value capability scoped to one browsing session
///
/// Values written with `set` must be returned by `get` for the rest of the
/// session. Implementations absorb their own I/O failures (logging them) so
/// that a broken store degrades to "nothing cached" instead of failing reads.
pub trait SessionStore: Send + Sync {
    /// Value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: String);
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

/// Session store persisted as a single JSON object on disk
///
/// Every `set` writes the whole object through to the file, so a new process
/// opening the same path sees everything written so far. `clear` ends the
/// session by deleting the file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileSessionStore {
    /// Open (or start) a session file
    ///
    /// A missing file starts an empty session. A file that is not a JSON
    /// object of strings is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let raw = std::fs::read(&path)?;
            match serde_json::from_slice::<HashMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding unreadable session file");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// End the session: forget every key and delete the file
    pub fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn write_through(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec(entries)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        if let Err(e) = self.write_through(&entries) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist session store");
        }
    }
}
