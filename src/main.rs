// src/main.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use gist_ai::{
    config,
    generator,
    news::NewsLoader,
    refresh::{RefreshService, RefreshTrigger},
    server::{AppState, NewsServer, Secrets},
    storage,
    utils::setup_logging,
};
use log::info;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gist-ai", version, about = "AI-generated news, cached and served over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Generate once, upload to the blob store, and exit
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    setup_logging(&level)?;
    info!("📰 gist-ai starting...");

    // --- Configuration & Initialization ---
    let app_config = config::load_config()?;
    let store = storage::from_config(&app_config).await?;
    let news_generator = generator::from_config(&app_config)?;
    let loader = Arc::new(NewsLoader::new(
        store,
        news_generator,
        app_config.blob_prefix.clone(),
        app_config.cache_window(),
    ));
    let refresher = Arc::new(RefreshService::new(
        loader.clone(),
        app_config.blob_pathname.clone(),
    ));

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Refresh => {
            let report = refresher.refresh(RefreshTrigger::Cli).await?;
            info!(
                "✅ Uploaded {} headlines / {} articles to {} (lastUpdated {})",
                report.count.headlines, report.count.articles, report.url, report.last_updated
            );
        }
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| app_config.bind_addr.clone());
            let state = AppState::new(loader, refresher, Secrets::from_config(&app_config));
            NewsServer::new(bind_addr, state).start().await?;
        }
    }

    Ok(())
}
