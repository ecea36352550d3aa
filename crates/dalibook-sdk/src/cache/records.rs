//! Single-record snapshots (member profiles)
//!
//! A profile page renders the last-seen record immediately and refreshes it
//! in the background; this is the cache behind the immediate render.

use super::snapshot::{FeedFamily, SnapshotStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;

/// Session-scoped cache of individual records keyed by id
#[derive(Clone)]
pub struct RecordCache<T> {
    snapshots: SnapshotStore,
    family: FeedFamily,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> RecordCache<T> {
    pub fn new(snapshots: SnapshotStore, family: FeedFamily) -> Self {
        Self {
            snapshots,
            family,
            _marker: PhantomData,
        }
    }

    /// Last stored record for `id`, if any
    pub fn cached(&self, id: impl Display) -> Option<T> {
        self.snapshots
            .load(&SnapshotStore::key(self.family, &id.to_string()))
    }

    /// Remember `record` for `id`
    pub fn store(&self, id: impl Display, record: &T) {
        self.snapshots
            .save(&SnapshotStore::key(self.family, &id.to_string()), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySessionStore;
    use dalibook_client::Member;
    use std::sync::Arc;

    #[test]
    fn test_profile_record_roundtrip_by_id() {
        let snapshots = SnapshotStore::new(Arc::new(MemorySessionStore::new()));
        let profiles: RecordCache<Member> = RecordCache::new(snapshots, FeedFamily::ProfileRecord);

        assert!(profiles.cached(7).is_none());

        let member: Member = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Ada",
            "major": "Computer Science"
        }))
        .unwrap();
        profiles.store(7, &member);

        let cached = profiles.cached(7).unwrap();
        assert_eq!(cached.name, "Ada");
        assert!(profiles.cached(8).is_none());
    }
}
