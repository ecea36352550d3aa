//! Segment keys and their retrieval routes

use crate::cache::{FeedFamily, SnapshotStore};
use dalibook_client::FeedRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

const PROFILE_PREFIX: &str = "profile__";
const PROJECT_PREFIX: &str = "project__";
const ALL_PROJECTS: &str = "all_projects";
const MY_PROJECTS: &str = "self";

/// Name of one logical feed view
///
/// Global topics are plain words (`all`, `following`, `projects`). Scoped
/// feeds carry their parent: `profile__{memberId}__{tab}` and
/// `project__{alias}__{tab}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentKey(String);

impl SegmentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Segment for a tab label as shown in the UI ("For You", "Following", ...)
    pub fn from_label(label: &str) -> Self {
        match label {
            "For You" | "Discover" => Self::new("all"),
            "All Projects" => Self::all_projects(),
            "My Projects" => Self::my_projects(),
            other => Self::new(other.to_lowercase()),
        }
    }

    /// Every project the viewer does not own, paged by offset
    pub fn all_projects() -> Self {
        Self::new(ALL_PROJECTS)
    }

    /// The viewer's own projects
    pub fn my_projects() -> Self {
        Self::new(MY_PROJECTS)
    }

    /// Tab of a member's profile ("posts" or "projects")
    pub fn profile(member_id: i64, tab: &str) -> Self {
        Self(format!("{}{}__{}", PROFILE_PREFIX, member_id, tab.to_lowercase()))
    }

    /// Tab of a project page ("posts" or "people")
    pub fn project(alias: &str, tab: &str) -> Self {
        Self(format!("{}{}__{}", PROJECT_PREFIX, alias, tab.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Snapshot namespace this segment persists into
    pub fn family(&self) -> FeedFamily {
        if self.0.starts_with(PROFILE_PREFIX) {
            FeedFamily::Profile
        } else if self.0.starts_with(PROJECT_PREFIX) {
            FeedFamily::Project
        } else {
            FeedFamily::Main
        }
    }

    /// Session store key of this segment's snapshot
    pub fn storage_key(&self) -> String {
        let name = match self.family() {
            FeedFamily::Profile => &self.0[PROFILE_PREFIX.len()..],
            FeedFamily::Project => &self.0[PROJECT_PREFIX.len()..],
            _ => self.0.as_str(),
        };
        SnapshotStore::key(self.family(), name)
    }

    /// Parent entity of a scoped segment (member id or project alias)
    pub fn parent(&self) -> Option<&str> {
        self.scoped_parts().map(|(parent, _)| parent)
    }

    /// Tab of a scoped segment
    pub fn tab(&self) -> Option<&str> {
        self.scoped_parts().map(|(_, tab)| tab)
    }

    fn scoped_parts(&self) -> Option<(&str, &str)> {
        let rest = self
            .0
            .strip_prefix(PROFILE_PREFIX)
            .or_else(|| self.0.strip_prefix(PROJECT_PREFIX))?;
        rest.rsplit_once("__")
    }

    /// Route that serves pages of this segment
    pub fn request(&self) -> FeedRequest {
        if self.family() == FeedFamily::Project {
            let (alias, tab) = self.scoped_parts().unwrap_or((self.0.as_str(), "posts"));
            return if tab == "people" {
                FeedRequest::ProjectMembers { alias: alias.to_string() }
            } else {
                FeedRequest::ProjectPosts { alias: alias.to_string() }
            };
        }

        if self.0 == ALL_PROJECTS {
            FeedRequest::AllProjects
        } else if self.0 == MY_PROJECTS {
            FeedRequest::Projects { topic: MY_PROJECTS.to_string() }
        } else if self.0.contains("projects") {
            FeedRequest::Projects { topic: self.0.clone() }
        } else if self.0 == "following" {
            // posts from the projects the viewer belongs to
            FeedRequest::Posts { topic: "projects".to_string() }
        } else {
            FeedRequest::Posts { topic: self.0.clone() }
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_map_to_topics() {
        assert_eq!(SegmentKey::from_label("For You").as_str(), "all");
        assert_eq!(SegmentKey::from_label("Discover").as_str(), "all");
        assert_eq!(SegmentKey::from_label("Following").as_str(), "following");
        assert_eq!(SegmentKey::from_label("Projects").as_str(), "projects");
        assert_eq!(SegmentKey::from_label("All Projects"), SegmentKey::all_projects());
        assert_eq!(SegmentKey::from_label("My Projects"), SegmentKey::my_projects());
    }

    #[test]
    fn test_routing() {
        assert_eq!(
            SegmentKey::new("all").request(),
            FeedRequest::Posts { topic: "all".into() }
        );
        assert_eq!(
            SegmentKey::new("following").request(),
            FeedRequest::Posts { topic: "projects".into() }
        );
        assert_eq!(
            SegmentKey::new("projects").request(),
            FeedRequest::Projects { topic: "projects".into() }
        );
        assert_eq!(SegmentKey::all_projects().request(), FeedRequest::AllProjects);
        assert_eq!(
            SegmentKey::my_projects().request(),
            FeedRequest::Projects { topic: "self".into() }
        );
        assert_eq!(
            SegmentKey::profile(7, "Posts").request(),
            FeedRequest::Posts { topic: "profile__7__posts".into() }
        );
        assert_eq!(
            SegmentKey::profile(7, "Projects").request(),
            FeedRequest::Projects { topic: "profile__7__projects".into() }
        );
        assert_eq!(
            SegmentKey::project("robots", "posts").request(),
            FeedRequest::ProjectPosts { alias: "robots".into() }
        );
        assert_eq!(
            SegmentKey::project("robots", "people").request(),
            FeedRequest::ProjectMembers { alias: "robots".into() }
        );
    }

    #[test]
    fn test_storage_keys_are_namespaced_by_family() {
        assert_eq!(SegmentKey::new("all").storage_key(), "main__all");
        assert_eq!(SegmentKey::my_projects().storage_key(), "main__self");
        assert_eq!(SegmentKey::profile(7, "posts").storage_key(), "profile__7__posts");
        assert_eq!(
            SegmentKey::project("robots", "posts").storage_key(),
            "project__robots__posts"
        );
    }

    #[test]
    fn test_parent_and_tab() {
        let key = SegmentKey::project("robots", "people");
        assert_eq!(key.parent(), Some("robots"));
        assert_eq!(key.tab(), Some("people"));
        assert_eq!(SegmentKey::new("all").parent(), None);
    }
}
