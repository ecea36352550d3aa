//! Session-scoped caching primitives
//!
//! Provides the key-value session capability the feed cache persists into,
//! typed snapshot helpers on top of it, and single-record caches.

mod records;
mod session_store;
mod snapshot;

pub use records::RecordCache;
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use snapshot::{FeedFamily, SnapshotStore};
