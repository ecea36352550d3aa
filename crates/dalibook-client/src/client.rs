//! HTTP client for the Dalibook API routes

use crate::error::{ClientError, Result};
use crate::types::*;
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Dalibook API
///
/// # Example
///
/// ```rust,no_run
/// use dalibook_client::{ClientConfig, DalibookClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DalibookClient::new(ClientConfig {
///     base_url: "https://dali.0z.gg".into(),
///     session_token: Some("token".into()),
///     ..Default::default()
/// })?;
///
/// // First page of the "For You" feed
/// let posts = client.posts("all", 0).await?;
///
/// // Like the newest post
/// if let Some(post) = posts.first() {
///     client.like_post(&post.id).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DalibookClient {
    config: ClientConfig,
    client: Client,
}

impl DalibookClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = config.session_token {
            let cookie = header::HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token))
                .map_err(|e| ClientError::Config(format!("invalid session token: {}", e)))?;
            headers.insert(header::COOKIE, cookie);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: ClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether requests are sent with a signed-in session
    pub fn is_signed_in(&self) -> bool {
        self.config.session_token.is_some()
    }

    // ==================== Feeds ====================

    /// Fetch one page of entities for a feed route
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        request: &FeedRequest,
        offset: usize,
    ) -> Result<Vec<T>> {
        let url = format!("{}{}", self.config.base_url, request.path(offset));
        tracing::debug!(%url, "fetching feed page");

        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Posts for a topic ("all", "projects", "profile__{id}__posts")
    pub async fn posts(&self, topic: &str, offset: usize) -> Result<Vec<Post>> {
        self.fetch_page(&FeedRequest::Posts { topic: topic.to_string() }, offset)
            .await
    }

    /// Projects for a topic ("all", "self", "profile__{id}__projects")
    pub async fn projects(&self, topic: &str, offset: usize) -> Result<Vec<Project>> {
        self.fetch_page(&FeedRequest::Projects { topic: topic.to_string() }, offset)
            .await
    }

    /// Posts made in a project
    pub async fn project_posts(&self, alias: &str, offset: usize) -> Result<Vec<Post>> {
        self.fetch_page(&FeedRequest::ProjectPosts { alias: alias.to_string() }, offset)
            .await
    }

    /// Members of a project
    pub async fn project_members(&self, alias: &str, offset: usize) -> Result<Vec<Member>> {
        self.fetch_page(&FeedRequest::ProjectMembers { alias: alias.to_string() }, offset)
            .await
    }

    /// Projects the viewer neither owns nor belongs to, most members first
    pub async fn all_projects(&self, offset: usize) -> Result<Vec<Project>> {
        self.fetch_page(&FeedRequest::AllProjects, offset).await
    }

    /// Projects with the most recent activity
    pub async fn trending_projects(&self) -> Result<Vec<Project>> {
        let url = format!("{}/api/projects/trending", self.config.base_url);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Full profile of a member
    pub async fn member(&self, member_id: i64) -> Result<Member> {
        let url = format!("{}/api/members/{}/get", self.config.base_url, member_id);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    // ==================== Toggles ====================

    /// Like a post
    pub async fn like_post(&self, post_id: &str) -> Result<()> {
        self.send_like(Method::POST, post_id).await
    }

    /// Remove a like from a post
    pub async fn unlike_post(&self, post_id: &str) -> Result<()> {
        self.send_like(Method::DELETE, post_id).await
    }

    /// Join a project
    pub async fn join_project(&self, alias: &str) -> Result<JoinResponse> {
        let url = format!(
            "{}/api/projects/{}/join",
            self.config.base_url,
            urlencoding::encode(alias)
        );
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Leave a project
    pub async fn leave_project(&self, alias: &str) -> Result<LeaveResponse> {
        let url = format!(
            "{}/api/projects/{}/leave",
            self.config.base_url,
            urlencoding::encode(alias)
        );
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    // ==================== Creation ====================

    /// Publish a post in a project
    pub async fn create_post(&self, post: &NewPost) -> Result<CreatePostResponse> {
        let url = format!("{}/api/posts/create", self.config.base_url);
        let response = self.client.post(&url).json(post).send().await?;
        self.handle_response(response).await
    }

    /// Create a project owned by the viewer
    pub async fn create_project(&self, project: &NewProject) -> Result<CreateProjectResponse> {
        let url = format!("{}/api/projects/create", self.config.base_url);
        let response = self.client.post(&url).json(project).send().await?;
        self.handle_response(response).await
    }

    /// Delete one of the viewer's own posts
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/posts/delete/{}",
            self.config.base_url,
            urlencoding::encode(post_id)
        );
        let response = self.client.get(&url).send().await?;
        self.check_status(response, post_id).await?;
        Ok(())
    }

    // ==================== Helpers ====================

    async fn send_like(&self, method: Method, post_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/posts/like/{}",
            self.config.base_url,
            urlencoding::encode(post_id)
        );

        let response = self
            .client
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        self.check_status(response, post_id).await?;
        Ok(())
    }

    async fn check_status(&self, response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(what.to_string())),
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let path = response.url().path().to_string();
        let response = self.check_status(response, &path).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> DalibookClient {
        DalibookClient::new(ClientConfig {
            base_url: server.uri(),
            session_token: token.map(String::from),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn post(id: &str, likes: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "content": "post",
            "createdAt": "2024-05-01T12:00:00Z",
            "authorId": 1,
            "author": { "id": 1, "name": "Ada" },
            "project": { "id": 1, "alias": "dalibook" },
            "_count": { "likes": likes },
            "likes": []
        })
    }

    #[tokio::test]
    async fn test_posts_sends_topic_offset_and_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/posts/get"))
            .and(query_param("topic", "all"))
            .and(query_param("offset", "30"))
            .and(header("cookie", "next-auth.session-token=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![post("p1", 2)]))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("abc"));
        let posts = client.posts("all", 30).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].counts.likes, 2);
    }

    #[tokio::test]
    async fn test_like_and_unlike_use_post_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/posts/like/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/posts/like/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("abc"));
        client.like_post("p1").await.unwrap();
        client.unlike_post("p1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/posts/like/p1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "Unauthorized"})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.like_post("p1").await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_server_error_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/get"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        match client.projects("all", 0).await.unwrap_err() {
            ClientError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_join_project_returns_joined_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/robots/join"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"joined": true})))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("abc"));
        let response = client.join_project("robots").await.unwrap();
        assert!(response.joined);
    }

    #[tokio::test]
    async fn test_leave_project_returns_left_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/robots/leave"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"left": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("abc"));
        let response = client.leave_project("robots").await.unwrap();
        assert!(response.left);
    }

    #[tokio::test]
    async fn test_all_projects_pages_by_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/all"))
            .and(query_param("offset", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 4,
                "alias": "kites",
                "owner": { "id": 2, "name": "Grace" },
                "members": [],
                "_count": { "members": 3, "posts": 1 }
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let projects = client.all_projects(20).await.unwrap();
        assert_eq!(projects[0].alias, "kites");
        assert_eq!(projects[0].member_count(), 4);
    }

    #[tokio::test]
    async fn test_create_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/posts/create"))
            .and(body_json(serde_json::json!({ "content": "hello", "projectAlias": "robots" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "postId": "clx9", "created": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("abc"));
        let response = client
            .create_post(&NewPost {
                content: "hello".into(),
                project_alias: "robots".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.post_id, "clx9");
        assert!(response.created);
    }

    #[tokio::test]
    async fn test_create_project_alias_taken() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/projects/create"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "This alias is taken!" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("abc"));
        let err = client
            .create_project(&NewProject {
                alias: "robots".into(),
                name: "Robots".into(),
                description: None,
            })
            .await
            .unwrap_err();
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("alias is taken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let err = DalibookClient::new(ClientConfig {
            session_token: Some("bad\ntoken".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = DalibookClient::new(ClientConfig {
            base_url: "http://localhost:3000/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.config().base_url, "http://localhost:3000");
        assert!(!client.is_signed_in());
    }
}
