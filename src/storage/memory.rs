//! Process-local blob store for development and tests.

use super::{BlobObject, BlobStore, PutOptions, PutResult};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct StoredBlob {
    body: String,
    uploaded_at: DateTime<Utc>,
    // Listing order; DashMap iteration order is arbitrary.
    sequence: u64,
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, StoredBlob>,
    next_sequence: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `body` at `pathname` with an explicit upload time.
    pub fn insert_at(&self, pathname: &str, body: impl Into<String>, uploaded_at: DateTime<Utc>) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.objects.insert(
            pathname.to_string(),
            StoredBlob {
                body: body.into(),
                uploaded_at,
                sequence,
            },
        );
    }

    pub fn get(&self, pathname: &str) -> Option<String> {
        self.objects.get(pathname).map(|b| b.body.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn url_for(pathname: &str) -> String {
        format!("memory://{}", pathname)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let mut found: Vec<(u64, BlobObject)> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| {
                (
                    entry.value().sequence,
                    BlobObject {
                        pathname: entry.key().clone(),
                        url: Self::url_for(entry.key()),
                        uploaded_at: Some(entry.value().uploaded_at),
                        size: Some(entry.value().body.len() as u64),
                    },
                )
            })
            .collect();
        found.sort_by_key(|(sequence, _)| *sequence);
        Ok(found.into_iter().map(|(_, object)| object).collect())
    }

    async fn fetch(&self, object: &BlobObject) -> Result<String> {
        self.get(&object.pathname)
            .ok_or_else(|| anyhow!("no object at '{}'", object.pathname))
    }

    async fn put(&self, pathname: &str, body: String, options: &PutOptions) -> Result<PutResult> {
        if !options.allow_overwrite && self.objects.contains_key(pathname) {
            return Err(anyhow!("object '{}' already exists", pathname));
        }
        self.insert_at(pathname, body, Utc::now());
        Ok(PutResult {
            url: Self::url_for(pathname),
            pathname: pathname.to_string(),
        })
    }
}
