//! Viewer session: the feeds, record caches, and toggles of one signed-in
//! (or anonymous) viewer, wired to a Dalibook server

use crate::cache::{FeedFamily, RecordCache, SessionStore, SnapshotStore};
use crate::error::{Result, SdkError};
use crate::feed::{FeedCache, HttpPageSource, PageSource, Placement, SegmentKey};
use crate::toggle::{
    HttpToggleTransport, SubjectId, SubjectKind, ToggleSubject, ToggleSync, ToggleTransport,
    DEFAULT_QUIET_PERIOD,
};
use crate::viewer::Viewer;
use async_trait::async_trait;
use chrono::Utc;
use dalibook_client::{
    ClientError, DalibookClient, Member, MemberSummary, NewPost, NewProject, Post, PostCounts,
    PostProject, Project, ProjectCounts, MAX_POST_LENGTH,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Entry point of the SDK
///
/// Global feeds (topic tabs) and scoped feeds (one profile or project page at
/// a time) are kept in separate caches so that opening another project does
/// not reset the home feed. Every cache persists into the same session store.
///
/// # Example
///
/// ```rust,ignore
/// let client = DalibookClient::new(ClientConfig::default())?;
/// let session = DalibookSession::new(client, Viewer::Member(7), Arc::new(MemorySessionStore::new()));
///
/// let home = SegmentKey::from_label("For You");
/// session.posts().ensure_segment(&home, true).await;
///
/// let post = session.posts().items(&home).remove(0);
/// session.like(&post).toggle();
/// ```
pub struct DalibookSession {
    client: DalibookClient,
    viewer: Viewer,
    snapshots: SnapshotStore,
    quiet_period: Duration,
    memberships: Arc<MembershipTracker>,

    posts: FeedCache<Post>,
    projects: FeedCache<Project>,
    scoped_posts: FeedCache<Post>,
    scoped_projects: FeedCache<Project>,
    scoped_members: FeedCache<Member>,
    profiles: RecordCache<Member>,
}

impl DalibookSession {
    /// Session backed by the HTTP routes of `client`
    pub fn new(client: DalibookClient, viewer: Viewer, store: Arc<dyn SessionStore>) -> Self {
        let source = HttpPageSource::new(client.clone());
        Self::with_collaborators(
            client.clone(),
            viewer,
            store,
            Arc::new(source.clone()),
            Arc::new(source.clone()),
            Arc::new(source),
            Arc::new(HttpToggleTransport::new(client)),
        )
    }

    /// Session with custom page sources and toggle transport
    pub fn with_collaborators(
        client: DalibookClient,
        viewer: Viewer,
        store: Arc<dyn SessionStore>,
        post_source: Arc<dyn PageSource<Post>>,
        project_source: Arc<dyn PageSource<Project>>,
        member_source: Arc<dyn PageSource<Member>>,
        transport: Arc<dyn ToggleTransport>,
    ) -> Self {
        let snapshots = SnapshotStore::new(store);
        let projects = FeedCache::new(project_source.clone(), snapshots.clone());
        Self {
            client,
            viewer,
            quiet_period: DEFAULT_QUIET_PERIOD,
            memberships: Arc::new(MembershipTracker {
                inner: transport,
                projects: projects.clone(),
                known: Mutex::new(HashMap::new()),
            }),
            posts: FeedCache::new(post_source.clone(), snapshots.clone()),
            projects,
            scoped_posts: FeedCache::new(post_source, snapshots.clone()),
            scoped_projects: FeedCache::new(project_source, snapshots.clone()),
            scoped_members: FeedCache::new(member_source, snapshots.clone()),
            profiles: RecordCache::new(snapshots.clone(), FeedFamily::ProfileRecord),
            snapshots,
        }
    }

    /// Override the toggle quiet period for synchronizers created afterwards
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    pub fn client(&self) -> &DalibookClient {
        &self.client
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    // ==================== Feeds ====================

    /// Post feeds of the home page ("all", "following")
    pub fn posts(&self) -> &FeedCache<Post> {
        &self.posts
    }

    /// Project feeds of the discover page, plus the viewer's own projects
    /// under [`SegmentKey::my_projects`]
    pub fn projects(&self) -> &FeedCache<Project> {
        &self.projects
    }

    /// Post tabs of the open profile or project page
    pub fn scoped_posts(&self) -> &FeedCache<Post> {
        &self.scoped_posts
    }

    /// Projects tab of the open profile page
    pub fn scoped_projects(&self) -> &FeedCache<Project> {
        &self.scoped_projects
    }

    /// People tab of the open project page
    pub fn scoped_members(&self) -> &FeedCache<Member> {
        &self.scoped_members
    }

    /// Make a profile the open page; scoped feeds of the previous page go stale
    pub fn open_profile(&self, member_id: i64) {
        self.set_scope(&SegmentKey::profile(member_id, "posts"));
    }

    /// Make a project the open page; scoped feeds of the previous page go stale
    pub fn open_project(&self, alias: &str) {
        self.set_scope(&SegmentKey::project(alias, "posts"));
    }

    fn set_scope(&self, key: &SegmentKey) {
        let scope = format!("{}:{}", key.family(), key.parent().unwrap_or_default());
        self.scoped_posts.set_context(Some(&scope));
        self.scoped_projects.set_context(Some(&scope));
        self.scoped_members.set_context(Some(&scope));
    }

    // ==================== Toggles ====================

    /// Like synchronizer for a fetched post
    pub fn like(&self, post: &Post) -> ToggleSync {
        self.toggle(ToggleSubject::from_post(post, &self.viewer))
    }

    /// Membership synchronizer for a fetched project
    ///
    /// A confirmed join adds the project to the viewer's project list, a
    /// confirmed leave takes it out.
    pub fn membership(&self, project: &Project) -> ToggleSync {
        self.memberships.remember(project);
        self.toggle(ToggleSubject::from_project(project, &self.viewer))
    }

    fn toggle(&self, subject: ToggleSubject) -> ToggleSync {
        let transport: Arc<dyn ToggleTransport> = self.memberships.clone();
        ToggleSync::with_quiet_period(subject, self.viewer, transport, self.quiet_period)
    }

    // ==================== Creation ====================

    /// Publish a post into a project and show it at the top of the cached feeds
    ///
    /// The post is prepended to `all`, `following`, the project's posts tab and
    /// the viewer's profile posts, wherever those are already loaded or
    /// snapshotted.
    pub async fn create_post(&self, content: &str, project_alias: &str) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SdkError::Validation("post content is empty".to_string()));
        }
        if content.chars().count() > MAX_POST_LENGTH {
            return Err(SdkError::Validation(format!(
                "post content is longer than {} characters",
                MAX_POST_LENGTH
            )));
        }
        if project_alias.is_empty() {
            return Err(SdkError::Validation("no project selected".to_string()));
        }
        let author = self.viewer_summary().await?;

        let response = self
            .client
            .create_post(&NewPost {
                content: content.to_string(),
                project_alias: project_alias.to_string(),
            })
            .await?;
        if !response.created {
            return Err(SdkError::Rejected(format!("post to {} not created", project_alias)));
        }

        let known = self.find_project(project_alias);
        let post = Post {
            id: response.post_id,
            content: Some(content.to_string()),
            created_at: Utc::now(),
            author_id: author.id,
            project_id: known.as_ref().map(|p| p.id),
            project: PostProject {
                id: known.as_ref().map_or(0, |p| p.id),
                name: known.as_ref().and_then(|p| p.name.clone()),
                alias: project_alias.to_string(),
                picture: known.as_ref().and_then(|p| p.picture.clone()),
            },
            author,
            counts: PostCounts::default(),
            likes: Vec::new(),
        };

        for key in [SegmentKey::new("all"), SegmentKey::new("following")] {
            self.posts.insert_item(&key, post.clone(), Placement::Front);
        }
        for key in [
            SegmentKey::project(project_alias, "posts"),
            SegmentKey::profile(post.author_id, "posts"),
        ] {
            self.scoped_posts.insert_item(&key, post.clone(), Placement::Front);
        }
        tracing::debug!(post_id = %post.id, project = project_alias, "post created");
        Ok(post)
    }

    /// Create a project owned by the viewer and add it to their project list
    pub async fn create_project(
        &self,
        alias: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        let alias = alias.trim();
        let name = name.trim();
        if alias.is_empty() || alias.chars().any(char::is_whitespace) {
            return Err(SdkError::Validation(format!("invalid project alias {:?}", alias)));
        }
        if name.is_empty() {
            return Err(SdkError::Validation("project name is empty".to_string()));
        }
        let owner = self.viewer_summary().await?;

        let response = self
            .client
            .create_project(&NewProject {
                alias: alias.to_string(),
                name: name.to_string(),
                description: description.map(str::to_string),
            })
            .await?;
        if !response.created {
            return Err(SdkError::Rejected(format!("project {} not created", alias)));
        }

        // the create route returns the bare row
        let record = response.project;
        let project = Project {
            id: record.id,
            alias: record.alias,
            name: record.name,
            description: record.description,
            picture: record.picture,
            created_at: record.created_at.or_else(|| Some(Utc::now())),
            owner,
            members: Vec::new(),
            counts: ProjectCounts::default(),
        };

        self.projects
            .insert_item(&SegmentKey::my_projects(), project.clone(), Placement::Back);
        tracing::debug!(alias = %project.alias, "project created");
        Ok(project)
    }

    /// The signed-in viewer as it appears on authored posts and owned projects
    async fn viewer_summary(&self) -> Result<MemberSummary> {
        let member_id = self.viewer.member_id().ok_or(ClientError::Unauthorized)?;
        let member = match self.cached_profile(member_id) {
            Some(member) => member,
            None => self.refresh_profile(member_id).await?,
        };
        Ok(MemberSummary {
            id: member.id,
            name: member.name,
            picture: member.picture,
            roles: member.roles,
        })
    }

    fn find_project(&self, alias: &str) -> Option<Project> {
        [SegmentKey::my_projects(), SegmentKey::all_projects(), SegmentKey::new("projects")]
            .iter()
            .flat_map(|key| self.projects.items(key))
            .find(|project| project.alias == alias)
            .or_else(|| self.memberships.known(alias))
    }

    // ==================== Records ====================

    /// Profile record last seen this session
    pub fn cached_profile(&self, member_id: i64) -> Option<Member> {
        self.profiles.cached(member_id)
    }

    /// Fetch a profile and remember it for the next visit
    pub async fn refresh_profile(&self, member_id: i64) -> Result<Member> {
        let member = self.client.member(member_id).await?;
        self.profiles.store(member_id, &member);
        Ok(member)
    }

    /// Delete a post on the server, then purge it from every feed and snapshot
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.client.delete_post(post_id).await?;
        self.posts.remove_item(post_id);
        self.scoped_posts.remove_item(post_id);
        tracing::debug!(post_id, "post deleted and purged from feeds");
        Ok(())
    }
}

/// Wraps the session's toggle transport and keeps the viewer's project list in
/// step with confirmed joins and leaves
struct MembershipTracker {
    inner: Arc<dyn ToggleTransport>,
    projects: FeedCache<Project>,
    known: Mutex<HashMap<String, Project>>,
}

impl MembershipTracker {
    fn remember(&self, project: &Project) {
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project.alias.clone(), project.clone());
    }

    fn known(&self, alias: &str) -> Option<Project> {
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alias)
            .cloned()
    }
}

#[async_trait]
impl ToggleTransport for MembershipTracker {
    async fn confirm(&self, subject: &SubjectId, engage: bool) -> Result<()> {
        self.inner.confirm(subject, engage).await?;
        if subject.kind != SubjectKind::Membership {
            return Ok(());
        }

        let mine = SegmentKey::my_projects();
        if engage {
            if let Some(project) = self.known(&subject.id) {
                self.projects.insert_item(&mine, project, Placement::Back);
            }
        } else {
            self.projects.remove_from(&mine, &subject.id);
        }
        Ok(())
    }
}
