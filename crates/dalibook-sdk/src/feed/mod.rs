//! Segmented feeds
//!
//! A feed is split into segments (topic tabs, profile tabs, project tabs),
//! each with its own items, load phase, and error slot.

mod feed_cache;
mod item;
mod segment;
mod source;

pub use feed_cache::{EnsureOutcome, FeedCache, ItemSource, Placement, Segment, SegmentPhase};
pub use item::FeedItem;
pub use segment::SegmentKey;
pub use source::{HttpPageSource, PageSource};
