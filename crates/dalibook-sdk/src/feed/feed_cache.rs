//! Segmented feed cache
//!
//! Holds one [`Segment`] per [`SegmentKey`] and moves it through an explicit
//! state machine:
//!
//! ```text
//!            ensure (initial)           success
//!   Empty ─────────────────────▶ Loading ───────▶ Ready
//!     ▲                            │  ▲             │
//!     │ invalidate / set_context   │  └─────────────┘ load_more
//!     │                    failure ▼
//!     └──────────────────────── Error
//! ```
//!
//! Persisted snapshots give an instant (possibly stale) render on revisit, a
//! per-segment epoch discards responses that resolve after the segment was
//! invalidated, and the `Loading` phase keeps at most one fetch in flight per
//! segment.

use super::item::FeedItem;
use super::segment::SegmentKey;
use super::source::PageSource;
use crate::cache::SnapshotStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Load phase of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPhase {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Where a segment's current items came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    /// Nothing has been installed yet
    None,
    /// Rehydrated from the session snapshot, possibly stale
    Snapshot,
    /// Returned by the retrieval collaborator this session
    Live,
}

/// One logical feed view
#[derive(Debug, Clone)]
pub struct Segment<T> {
    items: Vec<T>,
    phase: SegmentPhase,
    error: Option<String>,
    source: ItemSource,
    epoch: u64,
}

impl<T> Default for Segment<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            phase: SegmentPhase::Empty,
            error: None,
            source: ItemSource::None,
            epoch: 0,
        }
    }
}

impl<T> Segment<T> {
    /// Items in display order (newest first, as served)
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn phase(&self) -> SegmentPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SegmentPhase::Loading
    }

    /// Message of the last failed fetch, cleared when the next one starts
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn source(&self) -> ItemSource {
        self.source
    }

    /// Invalidation counter; a fetch dispatched under an older epoch is stale
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn reset(&mut self) {
        *self = Self {
            epoch: self.epoch + 1,
            ..Self::default()
        };
    }
}

/// Result of [`FeedCache::ensure_segment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A page was fetched and merged
    Fetched { received: usize, total: usize },
    /// Live items were already in memory, nothing fetched
    Reused,
    /// A fetch for this segment is already in flight, nothing fetched
    AlreadyLoading,
    /// The response arrived after the segment was invalidated and was dropped
    Discarded,
    /// The fetch failed; the message is also recorded on the segment
    Failed { message: String },
}

/// Where [`FeedCache::insert_item`] puts a new item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Newest first (posts)
    Front,
    /// After everything already listed (the viewer's own projects)
    Back,
}

struct FeedState<T> {
    segments: HashMap<SegmentKey, Segment<T>>,
    context: Option<String>,
}

/// Session-cached, paged feed lists keyed by segment
///
/// Cloning is cheap and every clone shares the same segments, so one clone
/// can load more while another renders.
///
/// # Example
///
/// ```rust,ignore
/// let feed: FeedCache<Post> = FeedCache::new(Arc::new(HttpPageSource::new(client)), snapshots);
/// let key = SegmentKey::from_label("For You");
///
/// feed.ensure_segment(&key, true).await;   // first page (snapshot shown meanwhile)
/// feed.load_more(&key).await;              // append the next page
///
/// let view = feed.segment(&key).unwrap();
/// for post in view.items() { /* render */ }
/// ```
pub struct FeedCache<T: FeedItem> {
    state: Arc<Mutex<FeedState<T>>>,
    source: Arc<dyn PageSource<T>>,
    snapshots: SnapshotStore,
}

impl<T: FeedItem> Clone for FeedCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            source: Arc::clone(&self.source),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<T: FeedItem> FeedCache<T> {
    pub fn new(source: Arc<dyn PageSource<T>>, snapshots: SnapshotStore) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                segments: HashMap::new(),
                context: None,
            })),
            source,
            snapshots,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of a segment's current state, if it has ever been touched
    pub fn segment(&self, key: &SegmentKey) -> Option<Segment<T>> {
        self.lock().segments.get(key).cloned()
    }

    /// Items of a segment (empty if unknown)
    pub fn items(&self, key: &SegmentKey) -> Vec<T> {
        self.lock()
            .segments
            .get(key)
            .map(|s| s.items.clone())
            .unwrap_or_default()
    }

    /// Currently active parent identity
    pub fn context(&self) -> Option<String> {
        self.lock().context.clone()
    }

    /// Populate or extend a segment
    ///
    /// With `initial` the fetched page replaces the items (after the session
    /// snapshot, if any, was installed for an immediate render); otherwise it
    /// is appended at offset `items.len()`. Fetch failures are recorded on the
    /// segment and reported as [`EnsureOutcome::Failed`], never as a panic or
    /// error return.
    pub async fn ensure_segment(&self, key: &SegmentKey, initial: bool) -> EnsureOutcome {
        let (epoch, offset) = {
            let mut state = self.lock();
            let segment = state.segments.entry(key.clone()).or_default();

            if segment.phase == SegmentPhase::Loading {
                tracing::debug!(segment = %key, "fetch already in flight");
                return EnsureOutcome::AlreadyLoading;
            }

            if initial && segment.phase == SegmentPhase::Ready && segment.source == ItemSource::Live {
                tracing::debug!(segment = %key, items = segment.items.len(), "reusing live items");
                return EnsureOutcome::Reused;
            }

            if initial {
                if let Some(items) = self.snapshots.load::<Vec<T>>(&key.storage_key()) {
                    tracing::debug!(segment = %key, items = items.len(), "rehydrated from snapshot");
                    segment.items = items;
                    segment.source = ItemSource::Snapshot;
                }
            }

            segment.phase = SegmentPhase::Loading;
            segment.error = None;
            let offset = if initial { 0 } else { segment.items.len() };
            (segment.epoch, offset)
        };

        let result = self.source.fetch_page(key, offset).await;

        let mut state = self.lock();
        let Some(segment) = state.segments.get_mut(key) else {
            return EnsureOutcome::Discarded;
        };

        if segment.epoch != epoch {
            tracing::debug!(
                segment = %key,
                dispatched = epoch,
                current = segment.epoch,
                "discarding stale response"
            );
            return EnsureOutcome::Discarded;
        }

        match result {
            Ok(page) => {
                let received = page.len();
                if initial {
                    segment.items = page;
                } else {
                    segment.items.extend(page);
                }
                segment.phase = SegmentPhase::Ready;
                segment.source = ItemSource::Live;

                let total = segment.items.len();
                let snapshot = segment.items.clone();
                drop(state);

                self.snapshots
                    .save_list(T::KIND, &key.storage_key(), &snapshot);
                tracing::debug!(segment = %key, offset, received, total, "segment updated");
                EnsureOutcome::Fetched { received, total }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(segment = %key, error = %message, "feed fetch failed");
                segment.phase = SegmentPhase::Error;
                segment.error = Some(message.clone());
                EnsureOutcome::Failed { message }
            }
        }
    }

    /// Fetch the next page of a segment and append it
    pub async fn load_more(&self, key: &SegmentKey) -> EnsureOutcome {
        self.ensure_segment(key, false).await
    }

    /// Reset a segment to `Empty`; an in-flight fetch for it becomes stale
    pub fn invalidate(&self, key: &SegmentKey) {
        let mut state = self.lock();
        if let Some(segment) = state.segments.get_mut(key) {
            segment.reset();
        }
    }

    /// Switch the active parent (project alias or member id)
    ///
    /// Changing the parent invalidates every segment, so responses to fetches
    /// issued under the previous parent are dropped when they arrive.
    pub fn set_context(&self, parent: Option<&str>) {
        let mut state = self.lock();
        if state.context.as_deref() == parent {
            return;
        }

        tracing::debug!(from = ?state.context, to = ?parent, "feed context changed");
        state.context = parent.map(str::to_string);
        for segment in state.segments.values_mut() {
            segment.reset();
        }
    }

    /// Remove an item everywhere: every in-memory segment and every snapshot
    /// of this item kind written this session
    pub fn remove_item(&self, id: &str) {
        {
            let mut state = self.lock();
            for segment in state.segments.values_mut() {
                segment.items.retain(|item| item.item_id() != id);
            }
        }

        for storage_key in self.snapshots.list_keys(T::KIND) {
            let Some(mut items) = self.snapshots.load::<Vec<T>>(&storage_key) else {
                continue;
            };
            let before = items.len();
            items.retain(|item| item.item_id() != id);
            if items.len() != before {
                self.snapshots.save_list(T::KIND, &storage_key, &items);
            }
        }
    }

    /// Add a locally created item to one segment and its snapshot
    ///
    /// Only a segment that already holds a list (in memory or in the session
    /// snapshot) is touched; one never loaded picks the item up on its first
    /// fetch. An item with the same id is replaced where it stands. Returns
    /// whether anything changed.
    pub fn insert_item(&self, key: &SegmentKey, item: T, placement: Placement) -> bool {
        let id = item.item_id();
        let place = |items: &mut Vec<T>| {
            if let Some(existing) = items.iter_mut().find(|i| i.item_id() == id) {
                *existing = item.clone();
                return;
            }
            match placement {
                Placement::Front => items.insert(0, item.clone()),
                Placement::Back => items.push(item.clone()),
            }
        };

        let mut touched = false;
        {
            let mut state = self.lock();
            if let Some(segment) = state.segments.get_mut(key) {
                if segment.phase != SegmentPhase::Empty {
                    place(&mut segment.items);
                    touched = true;
                }
            }
        }

        let storage_key = key.storage_key();
        if let Some(mut items) = self.snapshots.load::<Vec<T>>(&storage_key) {
            place(&mut items);
            self.snapshots.save_list(T::KIND, &storage_key, &items);
            touched = true;
        }

        tracing::debug!(segment = %key, item = %id, touched, "inserted local item");
        touched
    }

    /// Drop an item from one segment and its snapshot, leaving other segments alone
    pub fn remove_from(&self, key: &SegmentKey, id: &str) -> bool {
        let mut removed = false;
        {
            let mut state = self.lock();
            if let Some(segment) = state.segments.get_mut(key) {
                let before = segment.items.len();
                segment.items.retain(|item| item.item_id() != id);
                removed = segment.items.len() != before;
            }
        }

        let storage_key = key.storage_key();
        if let Some(mut items) = self.snapshots.load::<Vec<T>>(&storage_key) {
            let before = items.len();
            items.retain(|item| item.item_id() != id);
            if items.len() != before {
                self.snapshots.save_list(T::KIND, &storage_key, &items);
                removed = true;
            }
        }
        removed
    }

    /// Patch an item in place, in memory and in every snapshot holding it
    ///
    /// Returns the number of copies updated.
    pub fn update_item<F>(&self, id: &str, mut patch: F) -> usize
    where
        F: FnMut(&mut T),
    {
        let mut updated = 0;
        {
            let mut state = self.lock();
            for segment in state.segments.values_mut() {
                for item in segment.items.iter_mut().filter(|item| item.item_id() == id) {
                    patch(item);
                    updated += 1;
                }
            }
        }

        for storage_key in self.snapshots.list_keys(T::KIND) {
            let Some(mut items) = self.snapshots.load::<Vec<T>>(&storage_key) else {
                continue;
            };
            let mut changed = false;
            for item in items.iter_mut().filter(|item| item.item_id() == id) {
                patch(item);
                changed = true;
            }
            if changed {
                self.snapshots.save_list(T::KIND, &storage_key, &items);
            }
        }

        updated
    }
}
