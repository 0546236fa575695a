//! Blob-store seam: list by prefix, fetch, and upload-with-overwrite.
//!
//! Backends report failures as `anyhow::Error`; callers decide what a failure
//! means (the loader treats it as a cache miss, the refresh path as a 500).

pub mod http_blob;
pub mod memory;
pub mod redis_blob;

pub use http_blob::HttpBlobStore;
pub use memory::MemoryBlobStore;
pub use redis_blob::RedisBlobStore;

use crate::config::{BlobBackend, Config};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub pathname: String,
    pub url: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub access: Access,
    pub content_type: String,
    pub allow_overwrite: bool,
}

impl PutOptions {
    /// Public JSON, overwriting whatever is at the path.
    pub fn public_json_overwrite() -> Self {
        Self {
            access: Access::Public,
            content_type: "application/json".to_string(),
            allow_overwrite: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    pub url: String,
    pub pathname: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    fn name(&self) -> &str;

    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>>;

    async fn fetch(&self, object: &BlobObject) -> Result<String>;

    async fn put(&self, pathname: &str, body: String, options: &PutOptions) -> Result<PutResult>;
}

/// Picks the most recently uploaded object. Objects without an upload time
/// sort before any that have one; ties go to the one listed last.
pub fn select_latest(objects: Vec<BlobObject>) -> Option<BlobObject> {
    let mut latest: Option<BlobObject> = None;
    for object in objects {
        let newer = match &latest {
            None => true,
            Some(current) => object.uploaded_at >= current.uploaded_at,
        };
        if newer {
            latest = Some(object);
        }
    }
    latest
}

/// Builds the configured backend.
pub async fn from_config(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.blob_backend {
        BlobBackend::Http => Arc::new(HttpBlobStore::new(
            &config.blob_api_url,
            config.blob_read_write_token.clone(),
            config.request_timeout(),
        )?),
        BlobBackend::Redis => Arc::new(RedisBlobStore::new(&config.redis_url).await?),
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };
    info!("🗄️ Blob store backend: {}", store.name());
    Ok(store)
}
