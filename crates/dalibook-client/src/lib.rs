//! Rust client for the Dalibook API
//!
//! Typed access to the feed, profile, like, and project-membership routes of
//! the Dalibook web app. Responses deserialize into the wire types in
//! [`types`]; every non-success status surfaces as a [`ClientError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dalibook_client::{ClientConfig, DalibookClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DalibookClient::new(ClientConfig::default())?;
//! let projects = client.trending_projects().await?;
//! for project in projects {
//!     println!("{} ({} members)", project.alias, project.member_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export main types
pub use client::DalibookClient;
pub use error::{ClientError, Result};
pub use types::*;
