pub mod config;
pub mod error;
pub mod generator;
pub mod news;
pub mod refresh;
pub mod server;
pub mod storage;
pub mod testing; // Test doubles for the generator and blob-store seams
pub mod utils;

// Re-export the types most callers need
pub use error::{NewsError, Result};
pub use news::{Article, Headline, HeadlineFeed, NewsLoader, NewsSnapshot, SnapshotSource};
pub use refresh::{RefreshReport, RefreshService, RefreshTrigger};
