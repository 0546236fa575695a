// src/server/mod.rs
//! HTTP server: read-side pages, JSON read API, and admin refresh endpoints.

pub mod admin;
pub mod api;
pub mod pages;

use crate::config::Config;
use crate::news::NewsLoader;
use crate::refresh::RefreshService;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use std::sync::Arc;

/// Bearer secrets for the admin endpoints. `None` rejects every request.
#[derive(Clone, Default)]
pub struct Secrets {
    pub api_secret_key: Option<String>,
    pub cron_secret: Option<String>,
}

impl Secrets {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_secret_key: config.api_secret_key.clone(),
            cron_secret: config.cron_secret.clone(),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<NewsLoader>,
    pub refresher: Arc<RefreshService>,
    pub secrets: Arc<Secrets>,
}

impl AppState {
    pub fn new(loader: Arc<NewsLoader>, refresher: Arc<RefreshService>, secrets: Secrets) -> Self {
        Self {
            loader,
            refresher,
            secrets: Arc::new(secrets),
        }
    }
}

/// Builds the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/article/:id", get(pages::article))
        .route("/api/news/headlines", get(api::headlines))
        .route("/api/news/articles/:id", get(api::article))
        .route(
            "/api/articles/update",
            post(admin::update_articles).get(admin::update_usage),
        )
        .route("/api/cron/refresh-articles", get(admin::cron_refresh))
        .route("/health", get(api::health))
        .fallback(pages::not_found)
        .with_state(state)
}

pub struct NewsServer {
    bind_addr: String,
    state: AppState,
}

impl NewsServer {
    pub fn new(bind_addr: impl Into<String>, state: AppState) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            state,
        }
    }

    /// Serves until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;

        info!("🚀 News server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("👋 News server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
