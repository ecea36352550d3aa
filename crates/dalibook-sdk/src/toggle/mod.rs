//! Optimistic toggles for per-viewer relationships
//!
//! Liking a post and joining a project share one shape: a boolean the viewer
//! flips, a counter that moves with it, and a server call that confirms the
//! final state once the viewer stops clicking.

mod subject;
mod synchronizer;
mod transport;

pub use subject::{SubjectId, SubjectKind, ToggleSubject};
pub use synchronizer::{ToggleOutcome, ToggleState, ToggleSync, DEFAULT_QUIET_PERIOD};
pub use transport::{HttpToggleTransport, ToggleTransport};
