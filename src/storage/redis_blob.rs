// src/storage/redis_blob.rs
//! Redis-backed blob store. Each object is a hash with `body`, `contentType`
//! and `uploadedAt` fields keyed by its pathname.

use super::{BlobObject, BlobStore, PutOptions, PutResult};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::fmt;

/// Uses a `ConnectionManager` for automatic reconnection and resilience.
#[derive(Clone)]
pub struct RedisBlobStore {
    conn_manager: ConnectionManager,
    redis_url: String,
}

impl fmt::Debug for RedisBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBlobStore")
            .field("redis_url", &self.redis_url)
            .field("conn_manager", &"<ConnectionManager instance>")
            .finish()
    }
}

/// Escapes glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

impl RedisBlobStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        info!("Initializing Redis connection manager for URL: {}", redis_url);
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis ConnectionManager: {}", e);
            anyhow!("Failed to create Redis ConnectionManager: {}", e)
        })?;
        Ok(Self {
            conn_manager,
            redis_url: redis_url.to_string(),
        })
    }

    fn object_url(&self, pathname: &str) -> String {
        format!("{}/{}", self.redis_url.trim_end_matches('/'), pathname)
    }
}

#[async_trait]
impl BlobStore for RedisBlobStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let mut conn = self.conn_manager.clone();
        let keys: Vec<String> = {
            let mut iter: redis::AsyncIter<String> = conn.scan_match(match_pattern(prefix)).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };
        debug!("Redis SCAN for prefix '{}' found {} keys", prefix, keys.len());

        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let uploaded_at: Option<String> = conn.hget(&key, "uploadedAt").await?;
            objects.push(BlobObject {
                url: self.object_url(&key),
                uploaded_at: uploaded_at
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                size: None,
                pathname: key,
            });
        }
        Ok(objects)
    }

    async fn fetch(&self, object: &BlobObject) -> Result<String> {
        let mut conn = self.conn_manager.clone();
        let body: Option<String> = conn.hget(&object.pathname, "body").await?;
        body.ok_or_else(|| anyhow!("redis object '{}' has no body", object.pathname))
    }

    async fn put(&self, pathname: &str, body: String, options: &PutOptions) -> Result<PutResult> {
        let mut conn = self.conn_manager.clone();
        if !options.allow_overwrite {
            let exists: bool = conn.exists(pathname).await?;
            if exists {
                return Err(anyhow!("redis object '{}' already exists", pathname));
            }
        }

        let fields = [
            ("body", body),
            ("contentType", options.content_type.clone()),
            ("uploadedAt", Utc::now().to_rfc3339()),
        ];
        conn.hset_multiple::<_, _, _, ()>(pathname, &fields).await?;
        debug!("Redis HSET success for key: {}", pathname);

        Ok(PutResult {
            url: self.object_url(pathname),
            pathname: pathname.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::match_pattern;

    #[test]
    fn test_match_pattern_escapes_glob_characters() {
        assert_eq!(match_pattern("articles/"), "articles/*");
        assert_eq!(match_pattern("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }
}
