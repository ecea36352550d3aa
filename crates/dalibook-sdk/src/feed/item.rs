//! Entities that can be held in a feed segment

use dalibook_client::{Member, Post, Project};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity with a stable identity that feeds can list and cache
///
/// # Example
///
/// ```rust,ignore
/// impl FeedItem for Announcement {
///     const KIND: &'static str = "announcement";
///     fn item_id(&self) -> String { self.slug.clone() }
/// }
/// ```
pub trait FeedItem: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Kind tag, used to index persisted snapshots by item type
    const KIND: &'static str;

    /// Stable identity of this entity
    fn item_id(&self) -> String;
}

impl FeedItem for Post {
    const KIND: &'static str = "post";

    fn item_id(&self) -> String {
        self.id.clone()
    }
}

impl FeedItem for Project {
    const KIND: &'static str = "project";

    fn item_id(&self) -> String {
        self.alias.clone()
    }
}

impl FeedItem for Member {
    const KIND: &'static str = "member";

    fn item_id(&self) -> String {
        self.id.to_string()
    }
}
