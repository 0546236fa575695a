//! Test doubles for the generator and blob-store seams.
//!
//! - [`ScriptedGenerator`]: replays queued results and counts calls
//! - [`CountingBlobStore`]: wraps any store and counts list/fetch/put calls
//! - [`FailingBlobStore`]: every operation errors
//! - [`snapshot_with`]: builds a small valid snapshot

use crate::error::NewsError;
use crate::generator::NewsGenerator;
use crate::news::{Article, Headline, NewsSnapshot};
use crate::storage::{BlobObject, BlobStore, PutOptions, PutResult};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A snapshot with one article per id, titled after the id.
pub fn snapshot_with(ids: &[&str], last_updated: DateTime<Utc>) -> NewsSnapshot {
    let articles = ids
        .iter()
        .map(|id| {
            Article::new(
                Headline {
                    id: id.to_string(),
                    title: format!("Headline {}", id),
                    category: "World".to_string(),
                    published_at: last_updated.to_rfc3339(),
                },
                format!("First paragraph about {}.\n\nSecond paragraph.", id),
            )
        })
        .collect();
    NewsSnapshot::from_articles(articles, last_updated)
        .unwrap_or_else(|_| NewsSnapshot::empty(last_updated))
}

/// Replays queued results in order; once the queue is empty every call fails.
#[derive(Default)]
pub struct ScriptedGenerator {
    results: Mutex<VecDeque<Result<NewsSnapshot, NewsError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(snapshot: NewsSnapshot) -> Self {
        let generator = Self::new();
        generator.push(Ok(snapshot));
        generator
    }

    pub fn failing(error: NewsError) -> Self {
        let generator = Self::new();
        generator.push(Err(error));
        generator
    }

    /// Sleeps this long inside every `generate` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, result: Result<NewsSnapshot, NewsError>) {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self) -> Result<NewsSnapshot, NewsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(NewsError::GenerationFailed(
                    "scripted generator exhausted".to_string(),
                ))
            })
    }
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub list: AtomicUsize,
    pub fetch: AtomicUsize,
    pub put: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list.load(Ordering::SeqCst)
            + self.fetch.load(Ordering::SeqCst)
            + self.put.load(Ordering::SeqCst)
    }
}

pub struct CountingBlobStore {
    inner: Arc<dyn BlobStore>,
    pub counts: CallCounts,
    delay: Option<Duration>,
}

impl CountingBlobStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            counts: CallCounts::default(),
            delay: None,
        }
    }

    /// Sleeps this long inside every `list` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        self.counts.list.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.list(prefix).await
    }

    async fn fetch(&self, object: &BlobObject) -> Result<String> {
        self.counts.fetch.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(object).await
    }

    async fn put(&self, pathname: &str, body: String, options: &PutOptions) -> Result<PutResult> {
        self.counts.put.fetch_add(1, Ordering::SeqCst);
        self.inner.put(pathname, body, options).await
    }
}

#[derive(Debug, Default)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<BlobObject>> {
        Err(anyhow!("connection refused"))
    }

    async fn fetch(&self, object: &BlobObject) -> Result<String> {
        Err(anyhow!("connection refused while fetching {}", object.pathname))
    }

    async fn put(&self, pathname: &str, _body: String, _options: &PutOptions) -> Result<PutResult> {
        Err(anyhow!("connection refused while uploading {}", pathname))
    }
}
