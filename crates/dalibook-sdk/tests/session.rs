//! End-to-end behavior of a viewer session against a mock Dalibook server

use dalibook_sdk::{
    ClientConfig, DalibookClient, DalibookSession, EnsureOutcome, FileSessionStore, ItemSource,
    MemorySessionStore, SdkError, SegmentKey, SegmentPhase, SessionStore, ToggleOutcome, Viewer,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post(id: &str, likes: u64, liked_by: &[i64]) -> serde_json::Value {
    let likes_list: Vec<_> = liked_by.iter().map(|m| json!({ "memberId": m })).collect();
    json!({
        "id": id,
        "content": format!("post {id}"),
        "createdAt": "2024-05-01T12:00:00Z",
        "authorId": 1,
        "author": { "id": 1, "name": "Ada" },
        "project": { "id": 1, "alias": "robots" },
        "_count": { "likes": likes },
        "likes": likes_list
    })
}

fn page(prefix: &str, count: usize) -> serde_json::Value {
    let posts: Vec<_> = (0..count).map(|i| post(&format!("{prefix}{i}"), 0, &[])).collect();
    json!(posts)
}

fn project(id: i64, alias: &str, owner: i64, members: &[i64]) -> serde_json::Value {
    let members: Vec<_> = members.iter().map(|m| json!({ "id": m, "name": "member" })).collect();
    json!({
        "id": id,
        "alias": alias,
        "name": alias.to_uppercase(),
        "owner": { "id": owner, "name": "Ada" },
        "members": members,
        "_count": { "members": members.len(), "posts": 0 }
    })
}

async fn mount_viewer_profile(server: &MockServer, member_id: i64, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/members/{member_id}/get")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": member_id, "name": name })))
        .mount(server)
        .await;
}

fn session_for(server: &MockServer, viewer: Viewer, store: Arc<dyn SessionStore>) -> DalibookSession {
    let client = DalibookClient::new(ClientConfig {
        base_url: server.uri(),
        session_token: Some("token".into()),
        timeout_secs: 5,
    })
    .unwrap();
    DalibookSession::new(client, viewer, store).with_quiet_period(Duration::from_millis(50))
}

#[tokio::test]
async fn test_feed_pages_through_offsets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts/get"))
        .and(query_param("topic", "all"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("a", 30)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts/get"))
        .and(query_param("topic", "all"))
        .and(query_param("offset", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("b", 5)))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    let home = SegmentKey::from_label("For You");

    assert_eq!(
        session.posts().ensure_segment(&home, true).await,
        EnsureOutcome::Fetched { received: 30, total: 30 }
    );
    assert_eq!(
        session.posts().load_more(&home).await,
        EnsureOutcome::Fetched { received: 5, total: 35 }
    );
    assert_eq!(session.posts().ensure_segment(&home, true).await, EnsureOutcome::Reused);

    let items = session.posts().items(&home);
    assert_eq!(items[0].id, "a0");
    assert_eq!(items[30].id, "b0");
}

#[tokio::test]
async fn test_snapshot_survives_into_next_process() {
    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/robots/posts/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("r", 2)))
        .mount(&server)
        .await;

    let key = SegmentKey::project("robots", "posts");
    {
        let store = Arc::new(FileSessionStore::open(&session_file).unwrap());
        let session = session_for(&server, Viewer::Member(9), store);
        session.open_project("robots");
        session.scoped_posts().ensure_segment(&key, true).await;
    }

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/robots/posts/get"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;

    let store = Arc::new(FileSessionStore::open(&session_file).unwrap());
    let session = session_for(&server, Viewer::Member(9), store);
    session.open_project("robots");
    let outcome = session.scoped_posts().ensure_segment(&key, true).await;
    assert!(matches!(outcome, EnsureOutcome::Failed { .. }));

    let segment = session.scoped_posts().segment(&key).unwrap();
    assert_eq!(segment.phase(), SegmentPhase::Error);
    assert_eq!(segment.source(), ItemSource::Snapshot);
    assert_eq!(segment.items().len(), 2);
    assert!(segment.error().unwrap().contains("500"));
}

#[tokio::test]
async fn test_like_burst_confirms_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post("p1", 3, &[9])])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/posts/like/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/posts/like/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    let home = SegmentKey::new("all");
    session.posts().ensure_segment(&home, true).await;
    let post = session.posts().items(&home).remove(0);

    let like = session.like(&post);
    assert!(like.state().active);
    assert_eq!(like.toggle(), ToggleOutcome::Toggled { active: false, count: 2 });
    assert_eq!(like.toggle(), ToggleOutcome::Toggled { active: true, count: 3 });
    assert_eq!(like.toggle(), ToggleOutcome::Toggled { active: false, count: 2 });

    tokio::time::sleep(Duration::from_millis(300)).await;
    let state = like.state();
    assert!(!state.pending);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_failed_join_keeps_optimistic_membership() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "alias": "robots",
            "owner": { "id": 1, "name": "Ada" },
            "members": [],
            "_count": { "members": 0, "posts": 4 }
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/robots/join"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    let discover = SegmentKey::new("projects");
    session.projects().ensure_segment(&discover, true).await;
    let project = session.projects().items(&discover).remove(0);

    let membership = session.membership(&project);
    assert_eq!(membership.state().count, 1);
    membership.toggle();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = membership.state();
    assert!(state.active);
    assert_eq!(state.count, 2);
    assert!(state.last_error.unwrap().contains("db unavailable"));
}

#[tokio::test]
async fn test_anonymous_viewer_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Anonymous, Arc::new(MemorySessionStore::new()));
    let post: dalibook_sdk::Post = serde_json::from_value(post("p1", 3, &[])).unwrap();

    let like = session.like(&post);
    assert_eq!(like.toggle(), ToggleOutcome::LoginRequired);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(like.state().count, 3);
}

#[tokio::test]
async fn test_delete_post_purges_every_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts/get"))
        .and(query_param("topic", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post("p1", 0, &[]), post("p2", 0, &[])])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts/get"))
        .and(query_param("topic", "profile__1__posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post("p1", 0, &[])])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts/delete/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let session = session_for(&server, Viewer::Member(1), store.clone());
    let home = SegmentKey::new("all");
    let profile = SegmentKey::profile(1, "posts");
    session.posts().ensure_segment(&home, true).await;
    session.open_profile(1);
    session.scoped_posts().ensure_segment(&profile, true).await;

    session.delete_post("p1").await.unwrap();

    let home_ids: Vec<_> = session.posts().items(&home).into_iter().map(|p| p.id).collect();
    assert_eq!(home_ids, vec!["p2".to_string()]);
    assert!(session.scoped_posts().items(&profile).is_empty());
    assert!(!store.get("main__all").unwrap().contains("\"p1\""));
    assert_eq!(store.get("profile__1__posts").as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_profile_record_cached_after_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/members/7/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Grace",
            "major": "Mathematics",
            "birthday": "12-09"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    assert!(session.cached_profile(7).is_none());

    let fresh = session.refresh_profile(7).await.unwrap();
    assert_eq!(fresh.name, "Grace");
    assert_eq!(session.cached_profile(7).unwrap().major.as_deref(), Some("Mathematics"));
}

#[tokio::test]
async fn test_leave_confirms_and_drops_project_from_my_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/get"))
        .and(query_param("topic", "self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            project(3, "robots", 1, &[9]),
            project(4, "poetry", 9, &[])
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/robots/leave"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "left": true })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let session = session_for(&server, Viewer::Member(9), store.clone());
    let mine = SegmentKey::from_label("My Projects");
    session.projects().ensure_segment(&mine, true).await;
    let robots = session.projects().items(&mine).remove(0);

    let membership = session.membership(&robots);
    assert!(membership.state().active);
    assert_eq!(membership.toggle(), ToggleOutcome::Toggled { active: false, count: 1 });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = membership.state();
    assert!(!state.active);
    assert!(!state.pending);
    assert!(state.last_error.is_none());

    let aliases: Vec<_> = session.projects().items(&mine).into_iter().map(|p| p.alias).collect();
    assert_eq!(aliases, vec!["poetry".to_string()]);
    assert!(!store.get("main__self").unwrap().contains("\"robots\""));
}

#[tokio::test]
async fn test_confirmed_join_adds_project_to_my_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/get"))
        .and(query_param("topic", "self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/all"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([project(3, "robots", 1, &[])])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/robots/join"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "joined": true })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    let mine = SegmentKey::my_projects();
    let discover = SegmentKey::from_label("All Projects");
    session.projects().ensure_segment(&mine, true).await;
    session.projects().ensure_segment(&discover, true).await;
    let robots = session.projects().items(&discover).remove(0);

    let membership = session.membership(&robots);
    membership.toggle();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(membership.state().last_error.is_none());
    let mine: Vec<_> = session.projects().items(&mine).into_iter().map(|p| p.alias).collect();
    assert_eq!(mine, vec!["robots".to_string()]);
}

#[tokio::test]
async fn test_created_post_leads_cached_feeds() {
    let server = MockServer::start().await;
    mount_viewer_profile(&server, 9, "Grace").await;
    Mock::given(method("GET"))
        .and(path("/api/posts/get"))
        .and(query_param("topic", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("a", 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/robots/posts/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("r", 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/posts/create"))
        .and(body_json(json!({ "content": "first light", "projectAlias": "robots" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "postId": "new1", "created": true })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let session = session_for(&server, Viewer::Member(9), store.clone());
    let home = SegmentKey::new("all");
    let robots = SegmentKey::project("robots", "posts");
    session.posts().ensure_segment(&home, true).await;
    session.open_project("robots");
    session.scoped_posts().ensure_segment(&robots, true).await;

    let post = session.create_post("  first light ", "robots").await.unwrap();
    assert_eq!(post.id, "new1");
    assert_eq!(post.author.name, "Grace");
    assert_eq!(post.project.alias, "robots");
    assert_eq!(post.counts.likes, 0);

    let home_ids: Vec<_> = session.posts().items(&home).into_iter().map(|p| p.id).collect();
    assert_eq!(home_ids, vec!["new1", "a0", "a1"]);
    assert_eq!(session.scoped_posts().items(&robots)[0].id, "new1");
    assert!(store.get("main__all").unwrap().contains("\"new1\""));
    assert!(store.get("project__robots__posts").unwrap().contains("\"new1\""));
    // never loaded, so nothing to prepend to
    assert!(store.get("main__following").is_none());

    // the echo renders like any fetched post
    let like = session.like(&post);
    assert_eq!(like.state().count, 0);
}

#[tokio::test]
async fn test_invalid_post_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    let too_long = "x".repeat(256);

    assert!(matches!(
        session.create_post("   ", "robots").await,
        Err(SdkError::Validation(_))
    ));
    assert!(matches!(
        session.create_post(&too_long, "robots").await,
        Err(SdkError::Validation(_))
    ));
}

#[tokio::test]
async fn test_created_project_joins_my_list() {
    let server = MockServer::start().await;
    mount_viewer_profile(&server, 9, "Grace").await;
    Mock::given(method("GET"))
        .and(path("/api/projects/get"))
        .and(query_param("topic", "self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([project(3, "robots", 1, &[9])])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/projects/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project": { "id": 12, "alias": "kites", "name": "Kites", "ownerId": 9 },
            "created": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let session = session_for(&server, Viewer::Member(9), store.clone());
    let mine = SegmentKey::my_projects();
    session.projects().ensure_segment(&mine, true).await;

    let kites = session.create_project("kites", "Kites", None).await.unwrap();
    assert_eq!(kites.owner.name, "Grace");
    assert!(kites.joined_by(9));
    assert_eq!(kites.member_count(), 1);

    let aliases: Vec<_> = session.projects().items(&mine).into_iter().map(|p| p.alias).collect();
    assert_eq!(aliases, vec!["robots".to_string(), "kites".to_string()]);
    assert!(store.get("main__self").unwrap().contains("\"kites\""));
}

#[tokio::test]
async fn test_taken_alias_surfaces_server_message() {
    let server = MockServer::start().await;
    mount_viewer_profile(&server, 9, "Grace").await;
    Mock::given(method("POST"))
        .and(path("/api/projects/create"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "This alias is taken!" })))
        .mount(&server)
        .await;

    let session = session_for(&server, Viewer::Member(9), Arc::new(MemorySessionStore::new()));
    let err = session.create_project("robots", "Robots", Some("again")).await.unwrap_err();
    assert!(matches!(err, SdkError::Client(_)));
    assert!(err.to_string().contains("alias is taken"));
}
