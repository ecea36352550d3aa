//! Command handlers

use crate::config::Command;
use anyhow::{bail, Context};
use dalibook_sdk::{
    DalibookSession, EnsureOutcome, FeedCache, FeedFamily, FeedItem, FileSessionStore, Member,
    Post, Project, SegmentKey, ToggleOutcome, ToggleSync,
};
use dalibook_client::{FeedRequest, LikeRef};
use tracing::{info, warn};

pub async fn run(session: &DalibookSession, store: &FileSessionStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Feed { label, pages } => feed(session, &label, pages).await,
        Command::Profile { member_id, tab } => profile(session, member_id, &tab).await,
        Command::Project { alias, tab } => project(session, &alias, &tab).await,
        Command::Like { post_id, feed, times } => like(session, &post_id, &feed, times).await,
        Command::Join { alias, feed, times } => join(session, &alias, &feed, times).await,
        Command::Delete { post_id } => {
            session.delete_post(&post_id).await?;
            println!("deleted {}", post_id);
            Ok(())
        }
        Command::Post { project, content } => {
            let post = session
                .create_post(&content, &project)
                .await
                .with_context(|| format!("could not post in {}", project))?;
            print_post(&post);
            Ok(())
        }
        Command::CreateProject { alias, name, description } => {
            let project = session
                .create_project(&alias, &name, description.as_deref())
                .await
                .with_context(|| format!("could not create {}", alias))?;
            print_project(&project);
            Ok(())
        }
        Command::EndSession => {
            store.clear()?;
            info!("Session ended: {}", store.path().display());
            Ok(())
        }
    }
}

// ==================== Feeds ====================

async fn feed(session: &DalibookSession, label: &str, pages: usize) -> anyhow::Result<()> {
    let key = SegmentKey::from_label(label);
    if matches!(key.request(), FeedRequest::Projects { .. } | FeedRequest::AllProjects) {
        load(session.projects(), &key, pages).await;
        session.projects().items(&key).iter().for_each(print_project);
    } else {
        load(session.posts(), &key, pages).await;
        session.posts().items(&key).iter().for_each(print_post);
    }
    Ok(())
}

async fn profile(session: &DalibookSession, member_id: i64, tab: &str) -> anyhow::Result<()> {
    if let Some(cached) = session.cached_profile(member_id) {
        print_profile(&cached, true);
    }
    match session.refresh_profile(member_id).await {
        Ok(member) => print_profile(&member, false),
        Err(e) => warn!("Could not refresh profile {}: {}", member_id, e),
    }

    session.open_profile(member_id);
    let key = SegmentKey::profile(member_id, tab);
    if key.tab() == Some("projects") {
        load(session.scoped_projects(), &key, 1).await;
        session.scoped_projects().items(&key).iter().for_each(print_project);
    } else {
        load(session.scoped_posts(), &key, 1).await;
        session.scoped_posts().items(&key).iter().for_each(print_post);
    }
    Ok(())
}

async fn project(session: &DalibookSession, alias: &str, tab: &str) -> anyhow::Result<()> {
    session.open_project(alias);
    let key = SegmentKey::project(alias, tab);
    if key.tab() == Some("people") {
        load(session.scoped_members(), &key, 1).await;
        session.scoped_members().items(&key).iter().for_each(print_member);
    } else {
        load(session.scoped_posts(), &key, 1).await;
        session.scoped_posts().items(&key).iter().for_each(print_post);
    }
    Ok(())
}

/// Load the first page (rendering from the session snapshot if the network
/// fails) and then `pages - 1` more
async fn load<T: FeedItem>(cache: &FeedCache<T>, key: &SegmentKey, pages: usize) {
    let mut outcome = cache.ensure_segment(key, true).await;
    for _ in 1..pages {
        if !matches!(outcome, EnsureOutcome::Fetched { received, .. } if received > 0) {
            break;
        }
        outcome = cache.load_more(key).await;
    }

    match outcome {
        EnsureOutcome::Failed { message } => eprintln!("could not load {}: {}", key, message),
        other => info!("Segment {}: {:?}", key, other),
    }
}

// ==================== Toggles ====================

async fn like(session: &DalibookSession, post_id: &str, feed: &str, times: usize) -> anyhow::Result<()> {
    let key = SegmentKey::new(feed);
    let cache = if key.family() == FeedFamily::Main {
        session.posts()
    } else {
        session.scoped_posts()
    };

    load(cache, &key, 1).await;
    let post = cache
        .items(&key)
        .into_iter()
        .find(|p| p.id == post_id)
        .with_context(|| format!("post {} is not in feed {}", post_id, key))?;

    let sync = session.like(&post);
    if !settle(&sync, times).await? {
        return Ok(());
    }

    let state = sync.state();
    let member_id = session.viewer().member_id();
    let patched = cache.update_item(post_id, |post| {
        post.counts.likes = state.count;
        post.likes.retain(|like| Some(like.member_id) != member_id);
        if let (true, Some(member_id)) = (state.active, member_id) {
            post.likes.push(LikeRef { member_id });
        }
    });
    info!("Updated {} cached copies of {}", patched, post_id);
    Ok(())
}

async fn join(session: &DalibookSession, alias: &str, feed: &str, times: usize) -> anyhow::Result<()> {
    let key = SegmentKey::from_label(feed);
    // the viewer's own list is kept current by the join
    load(session.projects(), &SegmentKey::my_projects(), 1).await;
    load(session.projects(), &key, 1).await;
    let project = session
        .projects()
        .items(&key)
        .into_iter()
        .find(|p| p.alias == alias)
        .with_context(|| format!("project {} is not in feed {}", alias, key))?;

    let sync = session.membership(&project);
    if settle(&sync, times).await? {
        let mine = session.projects().items(&SegmentKey::my_projects()).len();
        info!("You are in {} projects", mine);
    }
    Ok(())
}

/// Toggle `times` times, then confirm right away instead of waiting out the
/// quiet period. Returns whether the server accepted the final state.
async fn settle(sync: &ToggleSync, times: usize) -> anyhow::Result<bool> {
    for _ in 0..times {
        match sync.toggle() {
            ToggleOutcome::LoginRequired => bail!("sign in to {}", sync.subject_id()),
            ToggleOutcome::Toggled { active, count } => {
                println!("{}: {} ({})", sync.subject_id(), if active { "on" } else { "off" }, count);
            }
        }
    }

    sync.flush().await;
    let state = sync.state();
    if let Some(error) = &state.last_error {
        // local state stays as toggled
        eprintln!("{} was not confirmed: {}", sync.subject_id(), error);
        return Ok(false);
    }
    Ok(true)
}

// ==================== Output ====================

fn print_post(post: &Post) {
    println!(
        "[{}] {} in {} · {} likes · {}",
        post.id,
        post.author.name,
        post.project.alias,
        post.counts.likes,
        post.created_at.format("%Y-%m-%d %H:%M"),
    );
    if let Some(content) = &post.content {
        println!("    {}", content);
    }
}

fn print_project(project: &Project) {
    println!(
        "{} · {} · {} members · {} posts",
        project.alias,
        project.name.as_deref().unwrap_or(&project.alias),
        project.member_count(),
        project.counts.posts,
    );
}

fn print_member(member: &Member) {
    println!("#{} {}", member.id, member.name);
}

fn print_profile(member: &Member, cached: bool) {
    let marker = if cached { " (cached)" } else { "" };
    println!("#{} {}{}", member.id, member.name, marker);
    if let Some(major) = &member.major {
        println!("    major: {}", major);
    }
    if let Some(birthday) = &member.birthday {
        println!("    birthday: {}", birthday);
    }
    for attribute in &member.attributes {
        println!("    {}: {}", attribute.name, attribute.value);
    }
}
