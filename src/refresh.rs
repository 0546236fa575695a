// src/refresh.rs
//! Generate a new snapshot, upload it over the fixed blob path, and install
//! it in the loader's cache. Shared by the admin endpoints and `gist-ai refresh`.

use crate::error::NewsError;
use crate::news::NewsLoader;
use crate::storage::PutOptions;
use crate::utils::Timer;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Who asked for the refresh; only used to tag log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Api,
    Cron,
    Cli,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RefreshTrigger::Api => "api",
            RefreshTrigger::Cron => "cron",
            RefreshTrigger::Cli => "cli",
        };
        write!(f, "{}", tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshCount {
    pub headlines: usize,
    pub articles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub url: String,
    pub count: RefreshCount,
    pub last_updated: DateTime<Utc>,
}

pub struct RefreshService {
    loader: Arc<NewsLoader>,
    pathname: String,
}

impl RefreshService {
    pub fn new(loader: Arc<NewsLoader>, pathname: impl Into<String>) -> Self {
        Self {
            loader,
            pathname: pathname.into(),
        }
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshReport, NewsError> {
        let result = self.run(trigger).await;
        if let Err(e) = &result {
            error!("[{}] Error refreshing articles: {}", trigger, e);
        }
        result
    }

    async fn run(&self, trigger: RefreshTrigger) -> Result<RefreshReport, NewsError> {
        let generator = self.loader.generator().ok_or_else(|| {
            NewsError::GeneratorUnavailable("XAI_API_KEY environment variable is not set".to_string())
        })?;

        let mut timer = Timer::start(&format!("{} refresh", trigger));
        info!("[{}] Generating news content with {}...", trigger, generator.name());
        let snapshot = generator.generate().await?;
        timer.checkpoint("generate");

        let body = snapshot.to_json_pretty()?;
        let put = self
            .loader
            .store()
            .put(&self.pathname, body, &PutOptions::public_json_overwrite())
            .await
            .map_err(|e| NewsError::StorageError(e.to_string()))?;
        timer.checkpoint("upload");
        info!("[{}] Successfully updated news data in blob storage: {}", trigger, put.url);

        let report = RefreshReport {
            url: put.url,
            count: RefreshCount {
                headlines: snapshot.headlines().len(),
                articles: snapshot.articles().len(),
            },
            last_updated: snapshot.last_updated(),
        };
        self.loader.install(snapshot).await;
        timer.finish_with_threshold(Duration::from_secs(120));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::SnapshotSource;
    use crate::storage::{BlobStore, MemoryBlobStore};
    use crate::testing::{snapshot_with, FailingBlobStore, ScriptedGenerator};
    use crate::generator::NewsGenerator;

    const PATH: &str = "articles/news-data.json";

    fn service(store: Arc<dyn BlobStore>, generator: Option<Arc<dyn NewsGenerator>>) -> RefreshService {
        let loader = Arc::new(NewsLoader::new(store, generator, "articles/", Duration::from_secs(3600)));
        RefreshService::new(loader, PATH)
    }

    #[tokio::test]
    async fn test_refresh_uploads_and_installs() {
        let store = Arc::new(MemoryBlobStore::new());
        let snapshot = snapshot_with(&["a", "b"], Utc::now());
        let refresher = service(
            store.clone(),
            Some(Arc::new(ScriptedGenerator::returning(snapshot.clone()))),
        );

        let report = refresher.refresh(RefreshTrigger::Api).await.unwrap();
        assert_eq!(report.url, "memory://articles/news-data.json");
        assert_eq!(report.count, RefreshCount { headlines: 2, articles: 2 });
        assert_eq!(report.last_updated, snapshot.last_updated());

        let stored = crate::news::NewsSnapshot::from_json(&store.get(PATH).unwrap()).unwrap();
        assert_eq!(stored, snapshot);

        let resolution = refresher.loader.resolve().await.unwrap();
        assert_eq!(resolution.source, SnapshotSource::Memory);
        assert_eq!(*resolution.snapshot, snapshot);
    }

    #[tokio::test]
    async fn test_refresh_without_generator_fails() {
        let refresher = service(Arc::new(MemoryBlobStore::new()), None);
        let err = refresher.refresh(RefreshTrigger::Cron).await.unwrap_err();
        assert!(matches!(err, NewsError::GeneratorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_upload_failure_is_a_storage_error() {
        let refresher = service(
            Arc::new(FailingBlobStore),
            Some(Arc::new(ScriptedGenerator::returning(snapshot_with(&["a"], Utc::now())))),
        );
        let err = refresher.refresh(RefreshTrigger::Api).await.unwrap_err();
        assert!(matches!(err, NewsError::StorageError(_)));
        // Nothing installed when the write fails.
        assert!(!refresher.loader.status().await.cached);
    }
}
