//! Configuration for the Dalibook CLI
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use dalibook_sdk::{ClientConfig, Viewer};
use std::path::PathBuf;
use std::time::Duration;

/// Dalibook - browse and engage with lab feeds from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "dalibook")]
#[command(about = "Browse Dalibook feeds, like posts, and join projects")]
pub struct Args {
    /// Base URL of the Dalibook web app
    #[arg(long, env = "DALIBOOK_URL", default_value = "http://localhost:3000")]
    pub url: String,

    /// Session token (value of the next-auth.session-token cookie)
    #[arg(long, env = "DALIBOOK_SESSION_TOKEN")]
    pub session_token: Option<String>,

    /// Member id of the signed-in viewer; omit to browse anonymously
    #[arg(long, env = "DALIBOOK_MEMBER_ID")]
    pub member_id: Option<i64>,

    /// File holding the session's cached feeds
    #[arg(long, env = "DALIBOOK_SESSION_FILE", default_value = ".dalibook-session.json")]
    pub session_file: PathBuf,

    /// Request timeout in seconds
    #[arg(long, env = "DALIBOOK_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Quiet period before a like or join is confirmed, in milliseconds
    #[arg(long, env = "QUIET_PERIOD_MS", default_value = "2000")]
    pub quiet_period_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show a home or discover feed ("For You", "Following", "Projects",
    /// "All Projects", "My Projects")
    Feed {
        /// Tab label or topic
        #[arg(default_value = "For You")]
        label: String,

        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },

    /// Show a member's profile and one of its tabs
    Profile {
        member_id: i64,

        /// Tab to list (posts, projects)
        #[arg(short, long, default_value = "posts")]
        tab: String,
    },

    /// Show a project page tab
    Project {
        alias: String,

        /// Tab to list (posts, people)
        #[arg(short, long, default_value = "posts")]
        tab: String,
    },

    /// Toggle your like on a post found in a feed
    Like {
        post_id: String,

        /// Feed the post appears in
        #[arg(long, default_value = "all")]
        feed: String,

        /// Number of times to toggle before confirming
        #[arg(short, long, default_value = "1")]
        times: usize,
    },

    /// Toggle your membership of a project found in a project feed
    Join {
        alias: String,

        /// Feed the project appears in
        #[arg(long, default_value = "All Projects")]
        feed: String,

        /// Number of times to toggle before confirming
        #[arg(short, long, default_value = "1")]
        times: usize,
    },

    /// Delete one of your posts
    Delete { post_id: String },

    /// Post into one of your projects
    Post {
        /// Alias of the project to post in
        project: String,

        content: String,
    },

    /// Create a project that you own
    CreateProject {
        alias: String,

        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Forget every cached feed by deleting the session file
    EndSession,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("DALIBOOK_URL must be an http(s) URL".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("DALIBOOK_TIMEOUT_SECS must be greater than zero".to_string());
        }

        match &self.command {
            Command::Like { .. }
            | Command::Join { .. }
            | Command::Delete { .. }
            | Command::Post { .. }
            | Command::CreateProject { .. }
                if self.member_id.is_none() =>
            {
                Err("DALIBOOK_MEMBER_ID is required for this command".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.url.clone(),
            session_token: self.session_token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn viewer(&self) -> Viewer {
        Viewer::from(self.member_id)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dalibook").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["feed"]);
        assert_eq!(args.quiet_period(), Duration::from_millis(2000));
        assert_eq!(args.client_config().timeout_secs, 30);
        match args.command {
            Command::Feed { label, pages } => {
                assert_eq!(label, "For You");
                assert_eq!(pages, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_viewer_from_member_id() {
        assert_eq!(parse(&["--member-id", "7", "feed"]).viewer(), Viewer::Member(7));
        assert_eq!(parse(&["feed"]).viewer(), Viewer::Anonymous);
    }

    #[test]
    fn test_toggles_require_member() {
        assert!(parse(&["like", "p1"]).validate().is_err());
        assert!(parse(&["--member-id", "7", "like", "p1"]).validate().is_ok());
        assert!(parse(&["project", "robots"]).validate().is_ok());
    }

    #[test]
    fn test_authoring_requires_member() {
        assert!(parse(&["post", "robots", "hello"]).validate().is_err());
        assert!(parse(&["create-project", "kites", "Kites"]).validate().is_err());

        let args = parse(&["--member-id", "7", "create-project", "kites", "Kites", "-d", "string and paper"]);
        assert!(args.validate().is_ok());
        match args.command {
            Command::CreateProject { alias, name, description } => {
                assert_eq!(alias, "kites");
                assert_eq!(name, "Kites");
                assert_eq!(description.as_deref(), Some("string and paper"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(parse(&["--url", "ftp://lab", "feed"]).validate().is_err());
    }
}
