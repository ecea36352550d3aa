//! Types for the Dalibook API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of items the server returns per feed page
pub const PAGE_SIZE: usize = 30;

/// Name of the cookie carrying the signed-in session
pub const SESSION_COOKIE: &str = "next-auth.session-token";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Dalibook web app (e.g., "https://dali.0z.gg")
    pub base_url: String,
    /// Session token of the signed-in member, if any
    pub session_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            session_token: None,
            timeout_secs: 30,
        }
    }
}

// ==================== Members ====================

/// Role granted to a member (e.g., "Developer", "Designer")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub alias: String,
    pub name: String,
}

/// Join row between a member and one of their roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRole {
    pub role: Role,
}

/// Free-form profile attribute ("fun fact", "quote", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Member as embedded in posts and projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub roles: Vec<MemberRole>,
}

/// Full member profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub minor: Option<String>,
    /// Birthday as "MM-DD"
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub roles: Vec<MemberRole>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Member {
    /// Look up a profile attribute by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

// ==================== Posts ====================

/// Project reference embedded in a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProject {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub alias: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Like count of a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub likes: u64,
}

/// A viewer's like, present only for signed-in requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRef {
    pub member_id: i64,
}

/// Post with author, project, and like information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub author: MemberSummary,
    pub project: PostProject,
    #[serde(rename = "_count", default)]
    pub counts: PostCounts,
    #[serde(default)]
    pub likes: Vec<LikeRef>,
}

impl Post {
    /// Whether the given member has liked this post
    pub fn liked_by(&self, member_id: i64) -> bool {
        self.likes.iter().any(|like| like.member_id == member_id)
    }
}

// ==================== Projects ====================

/// Member and post counts of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCounts {
    #[serde(default)]
    pub members: u64,
    #[serde(default)]
    pub posts: u64,
}

/// Project with owner, members, and counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub alias: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub owner: MemberSummary,
    #[serde(default)]
    pub members: Vec<MemberSummary>,
    #[serde(rename = "_count", default)]
    pub counts: ProjectCounts,
}

impl Project {
    /// Member count including the owner, who is not listed in `members`
    pub fn member_count(&self) -> u64 {
        self.counts.members + 1
    }

    /// Whether the given member owns or has joined this project
    pub fn joined_by(&self, member_id: i64) -> bool {
        self.owner.id == member_id || self.members.iter().any(|m| m.id == member_id)
    }
}

/// Response from the join route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub joined: bool,
}

/// Response from the leave route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub left: bool,
}

/// Project row as returned by the create route (no owner or counts attached)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: i64,
    pub alias: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

// ==================== Creation ====================

/// Longest post the server accepts, in characters
pub const MAX_POST_LENGTH: usize = 255;

/// Body of POST /api/posts/create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub content: String,
    pub project_alias: String,
}

/// Response from the post create route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostResponse {
    pub post_id: String,
    pub created: bool,
}

/// Body of POST /api/projects/create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub alias: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response from the project create route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub project: ProjectRecord,
    pub created: bool,
}

// ==================== Feed requests ====================

/// One retrieval route for a page of feed entities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedRequest {
    /// GET /api/posts/get?topic={topic}
    Posts { topic: String },
    /// GET /api/projects/get?topic={topic}
    Projects { topic: String },
    /// GET /api/projects/{alias}/posts/get
    ProjectPosts { alias: String },
    /// GET /api/projects/{alias}/members/get
    ProjectMembers { alias: String },
    /// GET /api/projects/all (projects the viewer has not joined, 20 per page)
    AllProjects,
}

impl FeedRequest {
    /// Path and query for this request at the given offset
    pub fn path(&self, offset: usize) -> String {
        match self {
            FeedRequest::Posts { topic } => format!(
                "/api/posts/get?topic={}&offset={}",
                urlencoding::encode(topic),
                offset
            ),
            FeedRequest::Projects { topic } => format!(
                "/api/projects/get?topic={}&offset={}",
                urlencoding::encode(topic),
                offset
            ),
            FeedRequest::ProjectPosts { alias } => format!(
                "/api/projects/{}/posts/get?offset={}",
                urlencoding::encode(alias),
                offset
            ),
            FeedRequest::ProjectMembers { alias } => format!(
                "/api/projects/{}/members/get?offset={}",
                urlencoding::encode(alias),
                offset
            ),
            FeedRequest::AllProjects => format!("/api/projects/all?offset={}", offset),
        }
    }
}
