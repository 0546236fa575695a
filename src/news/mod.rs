pub mod cache;
pub mod loader;
pub mod types;

pub use cache::{CacheStatus, NewsCache};
pub use loader::{MissReason, NewsLoader, RemoteLookup, Resolution, SnapshotSource};
pub use types::{Article, Headline, HeadlineFeed, NewsSnapshot};
