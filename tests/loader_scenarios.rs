//! Cache resolution scenarios for the news loader: memory fast path, blob
//! adoption, staleness, degrade-to-empty, and generator failure.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use gist_ai::{
    generator::{NewsGenerator, PlaceholderGenerator},
    news::{MissReason, NewsLoader, SnapshotSource},
    storage::{BlobStore, MemoryBlobStore},
    testing::{snapshot_with, CountingBlobStore, FailingBlobStore, ScriptedGenerator},
    utils::{Clock, ManualClock},
    NewsError,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const PREFIX: &str = "articles/";
const PATH: &str = "articles/news-data.json";
const WINDOW: Duration = Duration::from_secs(3600);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
}

fn loader(
    store: Arc<dyn BlobStore>,
    generator: Option<Arc<dyn NewsGenerator>>,
    clock: Arc<ManualClock>,
) -> NewsLoader {
    NewsLoader::new(store, generator, PREFIX, WINDOW).with_clock(clock)
}

/// A memory store holding one snapshot whose `lastUpdated` is `age` before `start()`.
fn store_with_snapshot(ids: &[&str], age: ChronoDuration) -> Arc<MemoryBlobStore> {
    let store = Arc::new(MemoryBlobStore::new());
    let updated = start() - age;
    let body = snapshot_with(ids, updated).to_json_pretty().unwrap();
    store.insert_at(PATH, body, updated);
    store
}

#[tokio::test]
async fn test_thirty_minute_old_blob_is_served_without_generation() {
    init_logging();
    let clock = Arc::new(ManualClock::new(start()));
    let generator = Arc::new(ScriptedGenerator::new());
    let loader = loader(
        store_with_snapshot(&["h1"], ChronoDuration::minutes(30)),
        Some(generator.clone()),
        clock,
    );

    let feed = loader.get_headlines().await.unwrap();
    assert_eq!(feed.headlines.len(), 1);
    assert_eq!(feed.headlines[0].id, "h1");
    assert_eq!(feed.last_updated, start() - ChronoDuration::minutes(30));

    let article = loader.get_article("h1").await.unwrap().unwrap();
    assert_eq!(article.content, "First paragraph about h1.\n\nSecond paragraph.");
    assert!(loader.get_article("missing").await.unwrap().is_none());

    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_fresh_memory_makes_no_external_calls() {
    let clock = Arc::new(ManualClock::new(start()));
    let store = Arc::new(CountingBlobStore::new(store_with_snapshot(
        &["h1", "h2"],
        ChronoDuration::minutes(10),
    )));
    let generator = Arc::new(ScriptedGenerator::new());
    let loader = loader(store.clone(), Some(generator.clone()), clock.clone());

    let first = loader.resolve().await.unwrap();
    assert_eq!(first.source, SnapshotSource::BlobStore);
    let calls_after_adoption = store.counts.total();
    assert_eq!(store.counts.list.load(Ordering::SeqCst), 1);
    assert_eq!(store.counts.fetch.load(Ordering::SeqCst), 1);

    // Memory age counts from adoption, not from the snapshot's lastUpdated.
    clock.advance(ChronoDuration::minutes(59));
    for _ in 0..3 {
        let again = loader.resolve().await.unwrap();
        assert_eq!(again.source, SnapshotSource::Memory);
        assert!(Arc::ptr_eq(&again.snapshot, &first.snapshot));
    }
    assert!(loader.get_article("h2").await.unwrap().is_some());

    assert_eq!(store.counts.total(), calls_after_adoption);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_stale_blob_is_not_adopted_and_triggers_generation() {
    let clock = Arc::new(ManualClock::new(start()));
    let regenerated = snapshot_with(&["new-1", "new-2"], start());
    let generator = Arc::new(ScriptedGenerator::returning(regenerated.clone()));
    let loader = loader(
        store_with_snapshot(&["old"], ChronoDuration::hours(2)),
        Some(generator.clone()),
        clock,
    );

    let resolution = loader.resolve().await.unwrap();
    assert_eq!(
        resolution.source,
        SnapshotSource::Generated {
            miss: MissReason::Stale {
                age: ChronoDuration::hours(2)
            }
        }
    );
    assert_eq!(*resolution.snapshot, regenerated);
    assert_eq!(generator.calls(), 1);

    // Adopted into memory: the next read is a hit.
    assert_eq!(loader.resolve().await.unwrap().source, SnapshotSource::Memory);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_blob_exactly_one_window_old_is_stale() {
    let clock = Arc::new(ManualClock::new(start()));
    let loader = loader(
        store_with_snapshot(&["old"], ChronoDuration::hours(1)),
        None,
        clock,
    );

    let resolution = loader.resolve().await.unwrap();
    assert!(matches!(
        resolution.source,
        SnapshotSource::Empty {
            miss: MissReason::Stale { .. }
        }
    ));
    assert!(resolution.snapshot.is_empty());
}

#[tokio::test]
async fn test_empty_store_without_credential_degrades_to_empty() {
    let clock = Arc::new(ManualClock::new(start()));
    let loader = loader(Arc::new(MemoryBlobStore::new()), None, clock.clone());

    let feed = loader.get_headlines().await.unwrap();
    assert!(feed.headlines.is_empty());
    assert_eq!(feed.last_updated, clock.now());

    let resolution = loader.resolve().await.unwrap();
    assert_eq!(
        resolution.source,
        SnapshotSource::Empty {
            miss: MissReason::NotFound
        }
    );
    // The empty snapshot is never held in memory.
    assert!(!loader.status().await.cached);
}

#[tokio::test]
async fn test_storage_failure_is_a_typed_miss() {
    let clock = Arc::new(ManualClock::new(start()));
    let loader_without_generator = loader(Arc::new(FailingBlobStore), None, clock.clone());

    let resolution = loader_without_generator.resolve().await.unwrap();
    match resolution.source {
        SnapshotSource::Empty {
            miss: MissReason::StorageUnavailable(detail),
        } => assert!(detail.contains("connection refused")),
        other => panic!("unexpected source: {:?}", other),
    }

    let generator = Arc::new(ScriptedGenerator::returning(snapshot_with(&["a"], start())));
    let loader_with_generator = loader(Arc::new(FailingBlobStore), Some(generator.clone()), clock);
    let resolution = loader_with_generator.resolve().await.unwrap();
    assert!(matches!(
        resolution.source,
        SnapshotSource::Generated {
            miss: MissReason::StorageUnavailable(_)
        }
    ));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_malformed_blob_is_a_typed_miss() {
    let clock = Arc::new(ManualClock::new(start()));
    let store = Arc::new(MemoryBlobStore::new());
    store.insert_at(PATH, r#"{"headlines": "nope"}"#, start());
    let loader = loader(store, None, clock);

    let resolution = loader.resolve().await.unwrap();
    assert!(matches!(
        resolution.source,
        SnapshotSource::Empty {
            miss: MissReason::Malformed(_)
        }
    ));
}

#[tokio::test]
async fn test_generator_failure_propagates_and_caches_nothing() {
    let clock = Arc::new(ManualClock::new(start()));
    let generator = Arc::new(ScriptedGenerator::failing(NewsError::GenerationFailed(
        "xAI returned HTTP 503".to_string(),
    )));
    let loader = loader(Arc::new(MemoryBlobStore::new()), Some(generator.clone()), clock);

    let err = loader.get_headlines().await.unwrap_err();
    assert!(matches!(err, NewsError::GenerationFailed(_)));
    assert!(!loader.status().await.cached);

    // No retry inside the loader: exactly one attempt per request.
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_latest_upload_under_prefix_wins() {
    let clock = Arc::new(ManualClock::new(start()));
    let store = Arc::new(MemoryBlobStore::new());
    let older = snapshot_with(&["older"], start() - ChronoDuration::minutes(20));
    let newer = snapshot_with(&["newer"], start() - ChronoDuration::minutes(5));
    // Listed first but uploaded later.
    store.insert_at("articles/b.json", newer.to_json_pretty().unwrap(), start() - ChronoDuration::minutes(5));
    store.insert_at("articles/a.json", older.to_json_pretty().unwrap(), start() - ChronoDuration::minutes(20));
    store.insert_at("drafts/c.json", "ignored", start());
    let loader = loader(store, None, clock);

    let feed = loader.get_headlines().await.unwrap();
    assert_eq!(feed.headlines[0].id, "newer");
}

#[tokio::test]
async fn test_memory_expiry_rechecks_blob_store() {
    let clock = Arc::new(ManualClock::new(start()));
    let store = Arc::new(CountingBlobStore::new(store_with_snapshot(
        &["h1"],
        ChronoDuration::minutes(5),
    )));
    let generator = Arc::new(ScriptedGenerator::returning(snapshot_with(&["fresh"], start())));
    let loader = loader(store.clone(), Some(generator.clone()), clock.clone());

    assert_eq!(loader.resolve().await.unwrap().source, SnapshotSource::BlobStore);

    // An hour later memory is expired and the blob's own lastUpdated is 65 minutes old.
    clock.advance(ChronoDuration::minutes(60));
    let resolution = loader.resolve().await.unwrap();
    assert!(matches!(resolution.source, SnapshotSource::Generated { .. }));
    assert_eq!(store.counts.list.load(Ordering::SeqCst), 2);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_misses_regenerate_once() {
    let clock = Arc::new(ManualClock::new(start()));
    let generator = Arc::new(
        ScriptedGenerator::returning(snapshot_with(&["a"], start()))
            .with_delay(Duration::from_millis(50)),
    );
    let loader = Arc::new(loader(
        Arc::new(MemoryBlobStore::new()),
        Some(generator.clone()),
        clock,
    ));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.get_headlines().await })
        })
        .collect();

    for handle in handles {
        let feed = handle.await.unwrap().unwrap();
        assert_eq!(feed.headlines.len(), 1);
    }
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_generated_snapshots_are_complete_and_consistent() {
    let clock = Arc::new(ManualClock::new(start()));
    let loader = loader(
        Arc::new(MemoryBlobStore::new()),
        Some(Arc::new(PlaceholderGenerator::with_clock(clock.clone()))),
        clock,
    );

    let snapshot = loader.resolve().await.unwrap().snapshot;
    let headline_ids: HashSet<&str> = snapshot.headlines().iter().map(|h| h.id.as_str()).collect();
    let article_ids: HashSet<&str> = snapshot.articles().keys().map(String::as_str).collect();

    assert_eq!(headline_ids, article_ids);
    assert_eq!(headline_ids.len(), snapshot.headlines().len());
    for (id, article) in snapshot.articles() {
        assert_eq!(id, &article.headline.id);
    }
}

#[tokio::test]
async fn test_concurrent_misses_share_one_failed_generation() {
    let clock = Arc::new(ManualClock::new(start()));
    let generator = ScriptedGenerator::new().with_delay(Duration::from_millis(200));
    for _ in 0..5 {
        generator.push(Err(NewsError::GenerationFailed("xAI returned HTTP 503".to_string())));
    }
    let generator = Arc::new(generator);
    let loader = Arc::new(loader(
        Arc::new(MemoryBlobStore::new()),
        Some(generator.clone()),
        clock,
    ));

    let started = std::time::Instant::now();
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.get_headlines().await })
        })
        .collect();
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, NewsError::GenerationFailed(_)));
    }

    assert_eq!(generator.calls(), 1);
    assert!(started.elapsed() < Duration::from_millis(600));

    // A request arriving after the failure tries again.
    assert!(loader.get_headlines().await.is_err());
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_misses_without_generator_share_one_lookup() {
    let clock = Arc::new(ManualClock::new(start()));
    let store = Arc::new(
        CountingBlobStore::new(Arc::new(MemoryBlobStore::new()))
            .with_delay(Duration::from_millis(50)),
    );
    let loader = Arc::new(loader(store.clone(), None, clock));

    let results = futures::future::join_all((0..5).map(|_| loader.resolve())).await;
    for result in results {
        let resolution = result.unwrap();
        assert!(resolution.snapshot.is_empty());
        assert_eq!(
            resolution.source,
            SnapshotSource::Empty {
                miss: MissReason::NotFound
            }
        );
    }

    assert_eq!(store.counts.list.load(Ordering::SeqCst), 1);
}
