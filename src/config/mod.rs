pub mod settings;

// Re-export the primary Config struct
pub use settings::{BlobBackend, Config};

use crate::error::NewsError;
use std::sync::Arc;

/// Loads and returns the application configuration as an `Arc<Config>`.
/// Reads `.env` first when present; invalid settings are a `ConfigError`.
pub fn load_config() -> Result<Arc<Config>, NewsError> {
    dotenv::dotenv().ok(); // Load .env file if present, ignore errors

    let config = Config::from_env();
    config.validate().map_err(NewsError::ConfigError)?;
    config.validate_and_log();

    Ok(Arc::new(config))
}
