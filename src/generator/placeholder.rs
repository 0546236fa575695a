//! Offline generator producing a fixed batch of placeholder stories. Handy for
//! local development and demos without an xAI key.

use super::NewsGenerator;
use crate::error::NewsError;
use crate::news::{Article, Headline, NewsSnapshot};
use crate::utils::{Clock, SystemClock};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat};
use std::sync::Arc;

const BATCH_SIZE: usize = 15;

const TITLES: &[&str] = &[
    "Lawmakers Unveil Sweeping Budget Proposal",
    "Chipmakers Race to Meet Surging Demand",
    "Markets Steady After Week of Volatility",
    "Researchers Report Progress on Carbon Capture",
    "Leaders Gather for Regional Security Talks",
    "Large Study Links Sleep to Heart Health",
    "Underdogs Advance in Championship Playoffs",
    "Museum Reopens With Record Crowds",
    "City Approves Major Transit Expansion",
    "Schools Roll Out New Reading Curriculum",
    "Lunar Lander Completes Key Test Flight",
    "Studios Announce Slate of Summer Releases",
    "Volunteers Rebuild Flood-Damaged Park",
    "Executives Weigh Outlook at Annual Forum",
    "Coastal Cleanup Initiative Gains Momentum",
];

const CATEGORIES: &[&str] = &[
    "Politics",
    "Technology",
    "Business",
    "Science",
    "World",
    "Health",
    "Sports",
    "Culture",
];

pub struct PlaceholderGenerator {
    clock: Arc<dyn Clock>,
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

fn placeholder_body(title: &str) -> String {
    format!(
        "This is placeholder coverage for \"{title}\". Details are still emerging and \
         the story will be updated as more information becomes available.\n\n\
         Observers say the development has been building for some time, with several \
         factors converging at once. Reactions so far have been mixed, and officials \
         have promised further statements in the coming days.\n\n\
         Set XAI_API_KEY to replace this text with generated reporting."
    )
}

#[async_trait]
impl NewsGenerator for PlaceholderGenerator {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn generate(&self) -> Result<NewsSnapshot, NewsError> {
        let now = self.clock.now();
        let articles = (0..BATCH_SIZE)
            .map(|i| {
                let title = TITLES[i % TITLES.len()];
                let headline = Headline {
                    id: format!("article-{}", i + 1),
                    title: title.to_string(),
                    category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                    published_at: (now - ChronoDuration::hours(i as i64))
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                };
                Article::new(headline, placeholder_body(title))
            })
            .collect();
        NewsSnapshot::from_articles(articles, now)
    }
}
