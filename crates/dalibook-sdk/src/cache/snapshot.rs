//! Typed JSON snapshots over a session store
//!
//! Key layout: `{family}__{name}`, e.g. `main__all`, `project__robots__posts`,
//! `profile_record__7`. Each list written is also recorded in a per-kind
//! index (`@index__{kind}`) so that every snapshot holding a given kind of
//! item can be revisited, e.g. to purge a deleted post.

use super::session_store::SessionStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Namespace of a group of snapshot keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedFamily {
    /// Global feeds ("all", "following", "projects")
    Main,
    /// Feeds scoped to one project
    Project,
    /// Feeds scoped to one member's profile
    Profile,
    /// Single member profile records
    ProfileRecord,
}

impl FeedFamily {
    pub fn prefix(&self) -> &'static str {
        match self {
            FeedFamily::Main => "main",
            FeedFamily::Project => "project",
            FeedFamily::Profile => "profile",
            FeedFamily::ProfileRecord => "profile_record",
        }
    }
}

impl fmt::Display for FeedFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Typed snapshot access to a shared [`SessionStore`]
///
/// Clones share one index lock, so every cache built from the same
/// `SnapshotStore` updates the per-kind indexes one at a time.
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn SessionStore>,
    index_lock: Arc<Mutex<()>>,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Storage key for a name within a family
    pub fn key(family: FeedFamily, name: &str) -> String {
        format!("{}__{}", family.prefix(), name)
    }

    fn index_key(kind: &str) -> String {
        format!("@index__{}", kind)
    }

    /// Load and decode the value under `key`
    ///
    /// Missing keys and undecodable values both read as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring undecodable snapshot");
                None
            }
        }
    }

    /// Encode and store `value` under `key`
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, raw),
            Err(e) => tracing::warn!(key, error = %e, "failed to encode snapshot"),
        }
    }

    /// Store a list of items of `kind` and remember the key in that kind's index
    pub fn save_list<T: Serialize>(&self, kind: &str, key: &str, items: &[T]) {
        self.save(key, items);

        let index_key = Self::index_key(kind);
        let _guard = self.index_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = self.load(&index_key).unwrap_or_default();
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            self.save(&index_key, &keys);
        }
    }

    /// Every key ever written with `save_list` for `kind` this session
    pub fn list_keys(&self, kind: &str) -> Vec<String> {
        self.load(&Self::index_key(kind)).unwrap_or_default()
    }
}
