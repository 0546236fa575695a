//! Decides where the current snapshot comes from: process memory, the blob
//! store, the generator, or (with no generator configured) nowhere.
//!
//! Resolution order:
//! 1. memory, if adopted less than one window ago (no external calls);
//! 2. the latest blob under the prefix, if its own `lastUpdated` is within
//!    the window;
//! 3. an empty snapshot when no generator is configured;
//! 4. a fresh generation.
//!
//! Blob failures become a [`MissReason`] and never reach the caller;
//! generator failures do. Requests that miss while another request is on
//! steps 2-4 wait for it and share its outcome, error or not.

use super::cache::{CacheStatus, NewsCache};
use super::types::{Article, HeadlineFeed, NewsSnapshot};
use crate::error::NewsError;
use crate::generator::NewsGenerator;
use crate::storage::{select_latest, BlobStore};
use crate::utils::{Clock, SystemClock};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Why the blob store did not supply a usable snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// Nothing stored under the prefix
    NotFound,
    /// Listing or fetching failed
    StorageUnavailable(String),
    /// An object was fetched but did not parse as a valid snapshot
    Malformed(String),
    /// A valid snapshot was found but its `lastUpdated` is outside the window
    Stale { age: ChronoDuration },
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NotFound => write!(f, "cache-miss: not-found"),
            MissReason::StorageUnavailable(e) => write!(f, "cache-miss: storage-unavailable ({})", e),
            MissReason::Malformed(e) => write!(f, "cache-miss: malformed ({})", e),
            MissReason::Stale { age } => write!(f, "cache-miss: stale ({}s old)", age.num_seconds()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    Fresh(NewsSnapshot),
    Miss(MissReason),
}

/// Where a resolved snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    Memory,
    BlobStore,
    Generated { miss: MissReason },
    Empty { miss: MissReason },
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub snapshot: Arc<NewsSnapshot>,
    pub source: SnapshotSource,
}

/// Outcome of the most recent slow-path attempt, numbered by `seq`.
#[derive(Debug, Default)]
struct LastAttempt {
    seq: u64,
    outcome: Option<Result<Resolution, NewsError>>,
}

pub struct NewsLoader {
    cache: NewsCache,
    // Held for the whole slow path; requests that queued behind an attempt
    // reuse its outcome instead of repeating it.
    slow_path: Mutex<LastAttempt>,
    attempts: AtomicU64,
    store: Arc<dyn BlobStore>,
    generator: Option<Arc<dyn NewsGenerator>>,
    clock: Arc<dyn Clock>,
    prefix: String,
}

impl fmt::Debug for NewsLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsLoader")
            .field("store", &self.store.name())
            .field("generator", &self.generator.as_ref().map(|g| g.name()))
            .field("prefix", &self.prefix)
            .field("window", &self.cache.window())
            .finish()
    }
}

impl NewsLoader {
    pub fn new(
        store: Arc<dyn BlobStore>,
        generator: Option<Arc<dyn NewsGenerator>>,
        prefix: impl Into<String>,
        window: Duration,
    ) -> Self {
        Self {
            cache: NewsCache::new(window),
            slow_path: Mutex::new(LastAttempt::default()),
            attempts: AtomicU64::new(0),
            store,
            generator,
            clock: Arc::new(SystemClock),
            prefix: prefix.into(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn generator(&self) -> Option<&Arc<dyn NewsGenerator>> {
        self.generator.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub async fn get_headlines(&self) -> Result<HeadlineFeed, NewsError> {
        Ok(self.resolve().await?.snapshot.feed())
    }

    /// `Ok(None)` for an unknown id.
    pub async fn get_article(&self, id: &str) -> Result<Option<Article>, NewsError> {
        Ok(self.resolve().await?.snapshot.article(id).cloned())
    }

    pub async fn resolve(&self) -> Result<Resolution, NewsError> {
        if let Some(snapshot) = self.cache.fresh(self.clock.now()).await {
            debug!("Using cached news content");
            return Ok(Resolution {
                snapshot,
                source: SnapshotSource::Memory,
            });
        }

        let ticket = self.attempts.load(Ordering::SeqCst);
        let mut last = self.slow_path.lock().await;

        // Another request may have refreshed while this one waited.
        let now = self.clock.now();
        if let Some(snapshot) = self.cache.fresh(now).await {
            debug!("Cache refreshed by a concurrent request");
            return Ok(Resolution {
                snapshot,
                source: SnapshotSource::Memory,
            });
        }
        if last.seq > ticket {
            if let Some(outcome) = &last.outcome {
                debug!("Reusing outcome of attempt #{} that finished while waiting", last.seq);
                return outcome.clone();
            }
        }

        let outcome = self.refresh_slow(now).await;
        last.seq = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        last.outcome = Some(outcome.clone());
        outcome
    }

    /// Blob lookup, then generation or the empty fallback. Caller holds the gate.
    async fn refresh_slow(&self, now: DateTime<Utc>) -> Result<Resolution, NewsError> {
        let miss = match self.lookup_remote(now).await {
            RemoteLookup::Fresh(snapshot) => {
                info!(
                    "📦 Adopting blob snapshot from {} ({} headlines)",
                    snapshot.last_updated(),
                    snapshot.headlines().len()
                );
                let snapshot = Arc::new(snapshot);
                self.cache.store(snapshot.clone(), now).await;
                return Ok(Resolution {
                    snapshot,
                    source: SnapshotSource::BlobStore,
                });
            }
            RemoteLookup::Miss(reason) => reason,
        };

        let generator = match &self.generator {
            Some(generator) => generator,
            None => {
                info!("No generator configured ({}); serving empty snapshot", miss);
                return Ok(Resolution {
                    snapshot: Arc::new(NewsSnapshot::empty(now)),
                    source: SnapshotSource::Empty { miss },
                });
            }
        };

        info!("🔄 Generating new news content via {} ({})", generator.name(), miss);
        let snapshot = Arc::new(generator.generate().await?);
        self.cache.store(snapshot.clone(), self.clock.now()).await;
        Ok(Resolution {
            snapshot,
            source: SnapshotSource::Generated { miss },
        })
    }

    /// Reads the latest blob under the prefix and classifies it against `now`.
    pub async fn lookup_remote(&self, now: DateTime<Utc>) -> RemoteLookup {
        let reason = match self.fetch_latest().await {
            Ok(snapshot) => {
                let age = snapshot.age_at(now);
                if snapshot.is_fresh_at(now, self.cache.window()) {
                    return RemoteLookup::Fresh(snapshot);
                }
                MissReason::Stale { age }
            }
            Err(reason) => reason,
        };

        match &reason {
            MissReason::StorageUnavailable(_) | MissReason::Malformed(_) => warn!("{}", reason),
            MissReason::NotFound | MissReason::Stale { .. } => info!("{}", reason),
        }
        RemoteLookup::Miss(reason)
    }

    async fn fetch_latest(&self) -> Result<NewsSnapshot, MissReason> {
        let objects = self
            .store
            .list(&self.prefix)
            .await
            .map_err(|e| MissReason::StorageUnavailable(e.to_string()))?;
        let latest = select_latest(objects).ok_or(MissReason::NotFound)?;
        debug!("Latest blob under '{}': {}", self.prefix, latest.pathname);

        let body = self
            .store
            .fetch(&latest)
            .await
            .map_err(|e| MissReason::StorageUnavailable(e.to_string()))?;
        NewsSnapshot::from_json(&body).map_err(|e| MissReason::Malformed(e.to_string()))
    }

    /// Replaces the in-memory snapshot unconditionally.
    pub async fn install(&self, snapshot: NewsSnapshot) -> Arc<NewsSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.cache.store(snapshot.clone(), self.clock.now()).await;
        snapshot
    }

    pub async fn status(&self) -> CacheStatus {
        self.cache.status(self.clock.now()).await
    }
}
