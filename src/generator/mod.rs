//! News generation behind a trait, so the loader and refresh path never see
//! which model (or none) produced a snapshot.

pub mod placeholder;
pub mod xai;

pub use placeholder::PlaceholderGenerator;
pub use xai::XaiGenerator;

use crate::config::Config;
use crate::error::NewsError;
use crate::news::NewsSnapshot;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

#[async_trait]
pub trait NewsGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Produces a complete, self-consistent snapshot or fails.
    async fn generate(&self) -> Result<NewsSnapshot, NewsError>;
}

/// `None` means no generator credential is configured; the read path then
/// degrades to an empty snapshot instead of failing.
pub fn from_config(config: &Config) -> Result<Option<Arc<dyn NewsGenerator>>, NewsError> {
    if config.placeholder_news {
        info!("📰 Using placeholder news generator");
        return Ok(Some(Arc::new(PlaceholderGenerator::new())));
    }
    match &config.xai_api_key {
        Some(key) => {
            info!("🤖 Using xAI generator with model {}", config.xai_model);
            Ok(Some(Arc::new(XaiGenerator::from_config(config, key.clone())?)))
        }
        None => Ok(None),
    }
}
