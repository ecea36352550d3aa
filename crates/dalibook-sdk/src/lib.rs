//! Dalibook SDK - optimistic toggles and session-cached feeds
//!
//! Client-side core of the Dalibook lab social network.
//!
//! # Architecture
//!
//! - **Toggles**: liking a post or joining a project flips local state at
//!   once and confirms with the server after a quiet period, so a burst of
//!   clicks costs a single request.
//! - **Feeds**: paged lists split into segments (topic, profile, and project
//!   tabs). Each segment renders its session snapshot immediately, fetches
//!   at most one page at a time, and drops responses that arrive after the
//!   viewer moved on.
//! - **Session store**: an injected key-value capability scoped to one
//!   browsing session; memory-backed or file-backed.
//!
//! # Example
//!
//! ```rust,ignore
//! use dalibook_sdk::{DalibookSession, MemorySessionStore, SegmentKey, Viewer};
//!
//! let session = DalibookSession::new(client, Viewer::Member(7), Arc::new(MemorySessionStore::new()));
//! let key = SegmentKey::from_label("For You");
//!
//! session.posts().ensure_segment(&key, true).await;
//! session.posts().load_more(&key).await;
//! ```

// Session-scoped key-value store and snapshots
pub mod cache;

// Segmented feed cache
pub mod feed;

// Debounced optimistic toggles
pub mod toggle;

// Viewer session wiring
pub mod session;

// Signed-in identity
pub mod viewer;

// Error types
pub mod error;

// Re-export cache types
pub use cache::{FeedFamily, FileSessionStore, MemorySessionStore, RecordCache, SessionStore, SnapshotStore};

// Re-export feed types
pub use feed::{
    EnsureOutcome, FeedCache, FeedItem, HttpPageSource, ItemSource, PageSource, Placement, Segment,
    SegmentKey, SegmentPhase,
};

// Re-export toggle types
pub use toggle::{
    HttpToggleTransport, SubjectId, SubjectKind, ToggleOutcome, ToggleState, ToggleSubject,
    ToggleSync, ToggleTransport, DEFAULT_QUIET_PERIOD,
};

pub use session::DalibookSession;
pub use viewer::Viewer;

// Re-export error types
pub use error::{Result, SdkError};

// Re-export from the HTTP client crate
pub use dalibook_client::{ClientConfig, DalibookClient, Member, Post, Project};
