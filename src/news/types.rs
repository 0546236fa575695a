//! Headline, article and snapshot types.
//!
//! The wire shape matches the blob object layout: camelCase keys,
//! `lastUpdated` as RFC 3339, article fields flattened over the headline.

use crate::error::NewsError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::convert::TryFrom;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub id: String,
    pub title: String,
    pub category: String,
    /// ISO-8601 publication time
    #[serde(default)]
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(flatten)]
    pub headline: Headline,
    pub content: String,
}

impl Article {
    pub fn new(headline: Headline, content: impl Into<String>) -> Self {
        Self {
            headline,
            content: content.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.headline.id
    }

    /// Body split on blank lines (`\n` or `\r\n` endings), blank paragraphs dropped.
    pub fn paragraphs(&self) -> Vec<String> {
        self.content
            .replace("\r\n", "\n")
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// `{ headlines, lastUpdated }` — the read-side view of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineFeed {
    pub headlines: Vec<Headline>,
    pub last_updated: DateTime<Utc>,
}

/// One generation cycle's complete dataset. Immutable once built; a refresh
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSnapshot")]
pub struct NewsSnapshot {
    headlines: Vec<Headline>,
    articles: BTreeMap<String, Article>,
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    headlines: Vec<Headline>,
    articles: BTreeMap<String, Article>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<RawSnapshot> for NewsSnapshot {
    type Error = NewsError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        NewsSnapshot::new(raw.headlines, raw.articles, raw.last_updated)
    }
}

impl NewsSnapshot {
    /// Builds a snapshot, rejecting any headline/article mismatch.
    pub fn new(
        headlines: Vec<Headline>,
        articles: BTreeMap<String, Article>,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, NewsError> {
        let mut seen = HashSet::with_capacity(headlines.len());
        for headline in &headlines {
            if headline.id.trim().is_empty() {
                return Err(NewsError::InvalidSnapshot(format!(
                    "headline '{}' has an empty id",
                    headline.title
                )));
            }
            if !seen.insert(headline.id.as_str()) {
                return Err(NewsError::InvalidSnapshot(format!(
                    "duplicate headline id '{}'",
                    headline.id
                )));
            }
            if !articles.contains_key(&headline.id) {
                return Err(NewsError::InvalidSnapshot(format!(
                    "headline '{}' has no article",
                    headline.id
                )));
            }
        }

        for (key, article) in &articles {
            if key != article.id() {
                return Err(NewsError::InvalidSnapshot(format!(
                    "article stored under '{}' carries id '{}'",
                    key,
                    article.id()
                )));
            }
            if !seen.contains(key.as_str()) {
                return Err(NewsError::InvalidSnapshot(format!(
                    "article '{}' has no headline",
                    key
                )));
            }
        }

        Ok(Self {
            headlines,
            articles,
            last_updated,
        })
    }

    /// Builds a snapshot whose headline order follows `articles`.
    pub fn from_articles(
        articles: Vec<Article>,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, NewsError> {
        let headlines = articles.iter().map(|a| a.headline.clone()).collect();
        let mut by_id = BTreeMap::new();
        for article in articles {
            let id = article.id().to_string();
            if by_id.insert(id.clone(), article).is_some() {
                return Err(NewsError::InvalidSnapshot(format!(
                    "duplicate article id '{}'",
                    id
                )));
            }
        }
        Self::new(headlines, by_id, last_updated)
    }

    /// The degrade-to-empty snapshot.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            headlines: Vec::new(),
            articles: BTreeMap::new(),
            last_updated: now,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, NewsError> {
        serde_json::from_str(raw).map_err(|e| NewsError::InvalidSnapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, NewsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn headlines(&self) -> &[Headline] {
        &self.headlines
    }

    pub fn articles(&self) -> &BTreeMap<String, Article> {
        &self.articles
    }

    pub fn article(&self, id: &str) -> Option<&Article> {
        self.articles.get(id)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn is_empty(&self) -> bool {
        self.headlines.is_empty()
    }

    pub fn feed(&self) -> HeadlineFeed {
        HeadlineFeed {
            headlines: self.headlines.clone(),
            last_updated: self.last_updated,
        }
    }

    /// Age measured from the snapshot's own `lastUpdated`. Timestamps in the
    /// future count as age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> ChronoDuration {
        (now - self.last_updated).max(ChronoDuration::zero())
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        is_within_window(self.age_at(now), window)
    }
}

/// `age < window`, with windows too large for chrono treated as unbounded.
pub(crate) fn is_within_window(age: ChronoDuration, window: Duration) -> bool {
    match ChronoDuration::from_std(window) {
        Ok(window) => age < window,
        Err(_) => true,
    }
}
