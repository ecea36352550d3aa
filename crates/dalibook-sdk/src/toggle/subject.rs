//! Toggle subjects: a per-viewer flag plus an aggregate count

use crate::viewer::Viewer;
use dalibook_client::{Post, Project};
use std::fmt;

/// Which relationship a subject toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    /// Member likes a post
    Like,
    /// Member belongs to a project
    Membership,
}

/// Address of a toggle endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId {
    pub kind: SubjectKind,
    /// Post id or project alias
    pub id: String,
}

impl SubjectId {
    pub fn like(post_id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Like,
            id: post_id.into(),
        }
    }

    pub fn membership(alias: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Membership,
            id: alias.into(),
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SubjectKind::Like => write!(f, "like:{}", self.id),
            SubjectKind::Membership => write!(f, "membership:{}", self.id),
        }
    }
}

/// Entity the viewer can engage with
///
/// `active` implies the viewer's own engagement is part of `count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleSubject {
    id: SubjectId,
    active: bool,
    count: u64,
}

impl ToggleSubject {
    /// Subject with an explicit starting state
    ///
    /// The count is raised to at least 1 when `active`, keeping the two
    /// consistent even if the server page was not.
    pub fn new(id: SubjectId, active: bool, count: u64) -> Self {
        let count = if active { count.max(1) } else { count };
        Self { id, active, count }
    }

    /// Like toggle for a fetched post
    pub fn from_post(post: &Post, viewer: &Viewer) -> Self {
        let liked = viewer.member_id().is_some_and(|id| post.liked_by(id));
        Self::new(SubjectId::like(post.id.clone()), liked, post.counts.likes)
    }

    /// Membership toggle for a fetched project
    pub fn from_project(project: &Project, viewer: &Viewer) -> Self {
        let joined = viewer.member_id().is_some_and(|id| project.joined_by(id));
        Self::new(
            SubjectId::membership(project.alias.clone()),
            joined,
            project.member_count(),
        )
    }

    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Flip the flag and move the count with it; returns the new flag
    pub(crate) fn flip(&mut self) -> bool {
        if self.active {
            self.active = false;
            self.count = self.count.saturating_sub(1);
        } else {
            self.active = true;
            self.count += 1;
        }
        self.active
    }
}
