//! In-process snapshot slot.
//!
//! Holds at most one `Arc<NewsSnapshot>` plus the wall-clock time it was
//! adopted. Readers clone the `Arc`; a refresh swaps it whole.

use super::types::{is_within_window, NewsSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<NewsSnapshot>,
    refreshed_at: DateTime<Utc>,
}

/// Point-in-time view of the cache, reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub cached: bool,
    pub fresh: bool,
    pub age_secs: Option<i64>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub headlines: usize,
    pub window_secs: u64,
}

#[derive(Debug)]
pub struct NewsCache {
    entry: RwLock<Option<CacheEntry>>,
    window: Duration,
}

impl NewsCache {
    pub fn new(window: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// The held snapshot, if it was adopted less than one window before `now`.
    pub async fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<NewsSnapshot>> {
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|entry| is_within_window(now - entry.refreshed_at, self.window))
            .map(|entry| entry.snapshot.clone())
    }

    pub async fn store(&self, snapshot: Arc<NewsSnapshot>, now: DateTime<Utc>) {
        let mut guard = self.entry.write().await;
        *guard = Some(CacheEntry {
            snapshot,
            refreshed_at: now,
        });
    }

    pub async fn status(&self, now: DateTime<Utc>) -> CacheStatus {
        let guard = self.entry.read().await;
        match guard.as_ref() {
            Some(entry) => {
                let age = now - entry.refreshed_at;
                CacheStatus {
                    cached: true,
                    fresh: is_within_window(age, self.window),
                    age_secs: Some(age.num_seconds()),
                    refreshed_at: Some(entry.refreshed_at),
                    last_updated: Some(entry.snapshot.last_updated()),
                    headlines: entry.snapshot.headlines().len(),
                    window_secs: self.window.as_secs(),
                }
            }
            None => CacheStatus {
                cached: false,
                fresh: false,
                age_secs: None,
                refreshed_at: None,
                last_updated: None,
                headlines: 0,
                window_secs: self.window.as_secs(),
            },
        }
    }
}
