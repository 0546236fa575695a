//! Server-rendered headline list and article detail pages.

use super::AppState;
use crate::error::NewsError;
use crate::news::{Article, Headline, HeadlineFeed};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use log::error;

const FEATURED_COUNT: usize = 3;

pub struct HeadlineCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub date: String,
    pub top: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub updated: String,
    pub featured: Vec<HeadlineCard>,
    pub latest: Vec<HeadlineCard>,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub title: String,
    pub category: String,
    pub date: String,
    pub paragraphs: Vec<String>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub message: String,
}

/// Formats an ISO-8601 timestamp with `fmt`; unparseable input passes through.
fn format_published(raw: &str, fmt: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).format(fmt).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn card(headline: &Headline, top: bool) -> HeadlineCard {
    HeadlineCard {
        id: headline.id.clone(),
        title: headline.title.clone(),
        category: headline.category.clone(),
        date: format_published(&headline.published_at, "%b %-d"),
        top,
    }
}

impl IndexTemplate {
    pub fn from_feed(feed: &HeadlineFeed) -> Self {
        let featured = feed
            .headlines
            .iter()
            .take(FEATURED_COUNT)
            .enumerate()
            .map(|(i, h)| card(h, i == 0))
            .collect();
        let latest = feed
            .headlines
            .iter()
            .skip(FEATURED_COUNT)
            .map(|h| card(h, false))
            .collect();
        Self {
            updated: feed.last_updated.format("%b %-d, %-I:%M %p UTC").to_string(),
            featured,
            latest,
        }
    }
}

impl ArticleTemplate {
    pub fn from_article(article: &Article) -> Self {
        Self {
            title: article.headline.title.clone(),
            category: article.headline.category.clone(),
            date: format_published(&article.headline.published_at, "%B %-d, %Y"),
            paragraphs: article.paragraphs(),
        }
    }
}

fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            let err = NewsError::from(e);
            error!("{}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

fn error_page(err: &NewsError) -> Response {
    error!("Read path failed: {}", err);
    render(
        err.status_code(),
        &ErrorTemplate {
            message: "We couldn't load today's stories. Please try again shortly.".to_string(),
        },
    )
}

pub async fn index(State(state): State<AppState>) -> Response {
    match state.loader.get_headlines().await {
        Ok(feed) => render(StatusCode::OK, &IndexTemplate::from_feed(&feed)),
        Err(e) => error_page(&e),
    }
}

pub async fn article(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.loader.get_article(&id).await {
        Ok(Some(article)) => render(StatusCode::OK, &ArticleTemplate::from_article(&article)),
        Ok(None) => not_found().await,
        Err(e) => error_page(&e),
    }
}

pub async fn not_found() -> Response {
    render(StatusCode::NOT_FOUND, &NotFoundTemplate {})
}
