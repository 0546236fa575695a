//! Bearer-authenticated refresh endpoints.
//!
//! `POST /api/articles/update` uses `API_SECRET_KEY`;
//! `GET /api/cron/refresh-articles` uses `CRON_SECRET`.

use super::AppState;
use crate::error::NewsError;
use crate::refresh::{RefreshReport, RefreshTrigger};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
};
use log::{error, warn};
use serde_json::{json, Value};

/// Token after `Bearer ` in the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// An unset secret rejects everything.
fn authorize(headers: &HeaderMap, secret: Option<&str>, name: &str) -> Result<(), NewsError> {
    match (bearer_token(headers), secret) {
        (Some(presented), Some(expected))
            if constant_time_eq(presented.as_bytes(), expected.as_bytes()) =>
        {
            Ok(())
        }
        _ => Err(NewsError::Unauthorized(format!("Invalid or missing {}", name))),
    }
}

fn unauthorized(body: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": body })))
}

fn success(message: &str, report: RefreshReport) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message,
            "url": report.url,
            "count": report.count,
            "lastUpdated": report.last_updated,
        })),
    )
}

fn failure(summary: &str, err: &NewsError) -> (StatusCode, Json<Value>) {
    (
        err.status_code(),
        Json(json!({
            "error": summary,
            "details": err.to_string(),
        })),
    )
}

pub async fn update_articles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = authorize(&headers, state.secrets.api_secret_key.as_deref(), "API key") {
        warn!("[api] Rejected update request: {}", e);
        return unauthorized("Unauthorized - Invalid or missing API key");
    }

    match state.refresher.refresh(RefreshTrigger::Api).await {
        Ok(report) => success("Articles generated and updated successfully", report),
        Err(e) => failure("Failed to update articles", &e),
    }
}

pub async fn update_usage(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Use POST method to generate and update articles",
        "description": format!(
            "Generates a fresh batch of headlines with articles and uploads it to {}.",
            state.refresher.pathname()
        ),
    }))
}

pub async fn cron_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = authorize(&headers, state.secrets.cron_secret.as_deref(), "CRON_SECRET") {
        error!("[cron] Unauthorized attempt to access cron endpoint: {}", e);
        return unauthorized("Unauthorized - Invalid or missing CRON_SECRET");
    }

    match state.refresher.refresh(RefreshTrigger::Cron).await {
        Ok(report) => success("Cron job executed successfully - articles refreshed", report),
        Err(e) => failure("Failed to refresh articles", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_authorize_requires_configured_secret() {
        let headers = headers_with("Bearer abc");
        assert!(authorize(&headers, Some("abc"), "API key").is_ok());
        assert!(authorize(&headers, Some("abd"), "API key").is_err());
        assert!(authorize(&headers, Some("abcd"), "API key").is_err());
        assert!(authorize(&headers, None, "API key").is_err());
        assert!(authorize(&HeaderMap::new(), Some("abc"), "API key").is_err());
    }
}
