//! Vercel-Blob-compatible REST client.
//!
//! `GET {api}?prefix=…&cursor=…` lists, `PUT {api}/{pathname}` uploads, and
//! objects are fetched from their public URL.

use super::{BlobObject, BlobStore, PutOptions, PutResult};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

const API_VERSION: &str = "7";
const MAX_LIST_PAGES: usize = 100;

#[derive(Clone)]
pub struct HttpBlobStore {
    client: Client,
    api_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("api_url", &self.api_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<set>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    blobs: Vec<ListedBlob>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedBlob {
    url: String,
    pathname: String,
    size: Option<u64>,
    uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
    pathname: String,
}

impl HttpBlobStore {
    pub fn new(api_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let api_url = Url::parse(api_url).with_context(|| format!("invalid blob API URL '{}'", api_url))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build blob HTTP client")?;
        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow!("BLOB_READ_WRITE_TOKEN is not configured"))
    }

    fn object_url(&self, pathname: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("blob API URL cannot be a base"))?
            .pop_if_empty()
            .extend(pathname.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let token = self.token()?;
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=MAX_LIST_PAGES {
            let mut url = self.api_url.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(c) = &cursor {
                    query.append_pair("cursor", c);
                }
            }

            let resp = self
                .client
                .get(url)
                .bearer_auth(token)
                .header("x-api-version", API_VERSION)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(anyhow!("blob list failed with HTTP {}", resp.status()));
            }
            let page: ListResponse = resp.json().await?;
            debug!("Blob list page for '{}': {} objects", prefix, page.blobs.len());

            objects.extend(page.blobs.into_iter().map(|b| BlobObject {
                pathname: b.pathname,
                url: b.url,
                uploaded_at: b.uploaded_at,
                size: b.size,
            }));

            match (page.has_more, page.cursor) {
                (true, Some(next)) if cursor.as_deref() == Some(next.as_str()) => {
                    warn!("Blob list for '{}' repeated cursor '{}'; stopping", prefix, next);
                    return Ok(objects);
                }
                (true, Some(next)) => cursor = Some(next),
                _ => return Ok(objects),
            }
            if page_number == MAX_LIST_PAGES {
                warn!("Blob list for '{}' still has more after {} pages; stopping", prefix, MAX_LIST_PAGES);
            }
        }

        Ok(objects)
    }

    async fn fetch(&self, object: &BlobObject) -> Result<String> {
        let resp = self.client.get(&object.url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "blob fetch of '{}' failed with HTTP {}",
                object.pathname,
                resp.status()
            ));
        }
        Ok(resp.text().await?)
    }

    async fn put(&self, pathname: &str, body: String, options: &PutOptions) -> Result<PutResult> {
        let token = self.token()?;
        let url = self.object_url(pathname)?;

        let resp = self
            .client
            .put(url)
            .bearer_auth(token)
            .header("x-api-version", API_VERSION)
            .header("x-vercel-blob-access", options.access.as_str())
            .header("x-content-type", options.content_type.as_str())
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", if options.allow_overwrite { "1" } else { "0" })
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("blob upload of '{}' failed with HTTP {}: {}", pathname, status, detail));
        }
        let put: PutResponse = resp.json().await?;
        Ok(PutResult {
            url: put.url,
            pathname: put.pathname,
        })
    }
}
