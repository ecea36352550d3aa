//! Dalibook CLI - browse lab feeds, like posts, and join projects

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dalibook_sdk::{DalibookClient, DalibookSession, FileSessionStore};

mod commands;
mod config;

use config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dalibook={},dalibook_sdk={},warn", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Server: {}", args.url);
    info!("Viewer: {:?}", args.viewer());
    info!("Session file: {}", args.session_file.display());

    let store = Arc::new(FileSessionStore::open(&args.session_file)?);
    let client = DalibookClient::new(args.client_config())?;
    let session = DalibookSession::new(client, args.viewer(), store.clone())
        .with_quiet_period(args.quiet_period());

    commands::run(&session, &store, args.command).await
}
