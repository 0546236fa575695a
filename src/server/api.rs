//! JSON read endpoints and health check.

use super::AppState;
use crate::news::HeadlineFeed;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::error;
use serde_json::json;

pub async fn headlines(State(state): State<AppState>) -> Response {
    match state.loader.get_headlines().await {
        Ok(feed) => Json::<HeadlineFeed>(feed).into_response(),
        Err(e) => {
            error!("Headline API failed: {}", e);
            (
                e.status_code(),
                Json(json!({ "error": "Failed to load headlines", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn article(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.loader.get_article(&id).await {
        Ok(Some(article)) => Json(article).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Article not found", "id": id })),
        )
            .into_response(),
        Err(e) => {
            error!("Article API failed for {}: {}", id, e);
            (
                e.status_code(),
                Json(json!({ "error": "Failed to load article", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.loader.status().await;
    Json(json!({
        "status": "healthy",
        "service": "gist-ai",
        "generator": state.loader.generator().map(|g| g.name()),
        "blobStore": state.loader.store().name(),
        "cache": cache,
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}
