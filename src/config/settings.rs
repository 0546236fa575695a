use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_XAI_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_XAI_MODEL: &str = "grok-4-1-fast-reasoning";
pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
pub const DEFAULT_BLOB_PREFIX: &str = "articles/";
pub const DEFAULT_BLOB_PATHNAME: &str = "articles/news-data.json";

/// Which blob-store implementation backs the durable cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Http,
    Redis,
    Memory,
}

impl FromStr for BlobBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "vercel" => Ok(BlobBackend::Http),
            "redis" => Ok(BlobBackend::Redis),
            "memory" => Ok(BlobBackend::Memory),
            other => Err(format!("unknown blob backend '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub log_level: String,
    pub cache_window_secs: u64,
    pub xai_api_key: Option<String>,
    pub xai_base_url: String,
    pub xai_model: String,
    pub xai_headline_count: usize,
    pub xai_timeout_secs: u64,
    pub xai_request_timeout_secs: u64,
    pub xai_article_concurrency: usize,
    pub placeholder_news: bool,
    pub blob_backend: BlobBackend,
    pub blob_read_write_token: Option<String>,
    pub blob_api_url: String,
    pub redis_url: String,
    pub blob_prefix: String,
    pub blob_pathname: String,
    pub api_secret_key: Option<String>,
    pub cron_secret: Option<String>,
}

// Secrets stay out of the startup log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("cache_window_secs", &self.cache_window_secs)
            .field("xai_api_key", &redact(&self.xai_api_key))
            .field("xai_base_url", &self.xai_base_url)
            .field("xai_model", &self.xai_model)
            .field("xai_headline_count", &self.xai_headline_count)
            .field("xai_timeout_secs", &self.xai_timeout_secs)
            .field("xai_request_timeout_secs", &self.xai_request_timeout_secs)
            .field("xai_article_concurrency", &self.xai_article_concurrency)
            .field("placeholder_news", &self.placeholder_news)
            .field("blob_backend", &self.blob_backend)
            .field("blob_read_write_token", &redact(&self.blob_read_write_token))
            .field("blob_api_url", &self.blob_api_url)
            .field("redis_url", &self.redis_url)
            .field("blob_prefix", &self.blob_prefix)
            .field("blob_pathname", &self.blob_pathname)
            .field("api_secret_key", &redact(&self.api_secret_key))
            .field("cron_secret", &redact(&self.cron_secret))
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            cache_window_secs: get("CACHE_WINDOW_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            xai_api_key: get("XAI_API_KEY"),
            xai_base_url: get("XAI_BASE_URL").unwrap_or_else(|| DEFAULT_XAI_BASE_URL.to_string()),
            xai_model: get("XAI_MODEL").unwrap_or_else(|| DEFAULT_XAI_MODEL.to_string()),
            xai_headline_count: get("XAI_HEADLINE_COUNT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            xai_timeout_secs: get("XAI_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            xai_request_timeout_secs: get("XAI_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            xai_article_concurrency: get("XAI_ARTICLE_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            placeholder_news: get("PLACEHOLDER_NEWS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            blob_backend: get("BLOB_BACKEND")
                .and_then(|v| v.parse().ok())
                .unwrap_or(BlobBackend::Http),
            blob_read_write_token: get("BLOB_READ_WRITE_TOKEN"),
            blob_api_url: get("BLOB_API_URL").unwrap_or_else(|| DEFAULT_BLOB_API_URL.to_string()),
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://localhost".to_string()),
            blob_prefix: get("BLOB_PREFIX").unwrap_or_else(|| DEFAULT_BLOB_PREFIX.to_string()),
            blob_pathname: get("BLOB_PATHNAME")
                .unwrap_or_else(|| DEFAULT_BLOB_PATHNAME.to_string()),
            api_secret_key: get("API_SECRET_KEY"),
            cron_secret: get("CRON_SECRET"),
        }
    }

    pub fn cache_window(&self) -> Duration {
        Duration::from_secs(self.cache_window_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.xai_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.xai_request_timeout_secs)
    }

    /// True when some generator can run: either a real credential or placeholder mode.
    pub fn generator_enabled(&self) -> bool {
        self.placeholder_news || self.xai_api_key.is_some()
    }

    /// Returns the first problem found, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_window_secs == 0 {
            return Err("CACHE_WINDOW_SECS must be greater than zero".to_string());
        }
        if !(1..=50).contains(&self.xai_headline_count) {
            return Err(format!(
                "XAI_HEADLINE_COUNT must be between 1 and 50, got {}",
                self.xai_headline_count
            ));
        }
        if self.xai_article_concurrency == 0 {
            return Err("XAI_ARTICLE_CONCURRENCY must be at least 1".to_string());
        }
        if self.xai_timeout_secs == 0 || self.xai_request_timeout_secs == 0 {
            return Err("generator timeouts must be greater than zero".to_string());
        }
        if !self.blob_pathname.starts_with(&self.blob_prefix) {
            return Err(format!(
                "BLOB_PATHNAME '{}' must live under BLOB_PREFIX '{}'",
                self.blob_pathname, self.blob_prefix
            ));
        }
        Ok(())
    }

    pub fn validate_and_log(&self) {
        log::info!("Application Configuration Loaded: {:?}", self);
        if !self.generator_enabled() {
            log::warn!("XAI_API_KEY is not set; reads will degrade to an empty snapshot on a cache miss");
        }
        if self.api_secret_key.is_none() {
            log::warn!("API_SECRET_KEY is not set; the update endpoint will reject every request");
        }
        if self.cron_secret.is_none() {
            log::warn!("CRON_SECRET is not set; the cron endpoint will reject every request");
        }
    }
}
