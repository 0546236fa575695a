//! xAI (Grok) chat-completions client that writes a batch of headlines and
//! then one article per headline.

use super::NewsGenerator;
use crate::config::Config;
use crate::error::NewsError;
use crate::news::{Article, Headline, NewsSnapshot};
use crate::utils::{Clock, SystemClock, Timer};
use async_trait::async_trait;
use chrono::SecondsFormat;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    search_parameters: SearchParameters,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct SearchParameters {
    mode: &'static str,
    return_citations: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// A headline as the model writes it: ids may be missing or numeric.
#[derive(Debug, Deserialize)]
struct RawHeadline {
    #[serde(default)]
    id: Option<Value>,
    title: String,
    #[serde(default)]
    category: Option<String>,
}

pub struct XaiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    headline_count: usize,
    article_concurrency: usize,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for XaiGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaiGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("headline_count", &self.headline_count)
            .field("article_concurrency", &self.article_concurrency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl XaiGenerator {
    pub fn from_config(config: &Config, api_key: String) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NewsError::ConfigError(format!("failed to build xAI client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.xai_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.xai_model.clone(),
            headline_count: config.xai_headline_count,
            article_concurrency: config.xai_article_concurrency.max(1),
            timeout: config.generation_timeout(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn chat(&self, prompt: &str) -> Result<String, NewsError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            search_parameters: SearchParameters {
                mode: "on",
                return_citations: true,
            },
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(NewsError::GenerationFailed(format!(
                "xAI returned HTTP {}: {}",
                status, detail
            )));
        }

        let body: ChatResponse = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| NewsError::MalformedOutput("xAI reply had no content".to_string()))
    }

    async fn write_article(&self, headline: Headline) -> Result<Article, NewsError> {
        debug!("Generating article for: {}", headline.title);
        let text = self.chat(&article_prompt(&headline.title)).await?;
        let published_at = self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(Article::new(
            Headline {
                published_at,
                ..headline
            },
            text.trim(),
        ))
    }

    async fn generate_batch(&self) -> Result<NewsSnapshot, NewsError> {
        let mut timer = Timer::start("xai generation");

        info!("[xai] Generating {} news headlines...", self.headline_count);
        let raw = self.chat(&headlines_prompt(self.headline_count)).await?;
        let headlines = parse_headlines(&raw, self.headline_count)?;
        info!("[xai] Generated {} headlines", headlines.len());
        timer.checkpoint("headlines");

        let articles: Vec<Article> = stream::iter(headlines)
            .map(|headline| self.write_article(headline))
            .buffered(self.article_concurrency)
            .try_collect()
            .await?;
        timer.checkpoint("articles");

        let snapshot = NewsSnapshot::from_articles(articles, self.clock.now())
            .map_err(|e| NewsError::MalformedOutput(e.to_string()))?;
        info!("[xai] Successfully generated {} articles", snapshot.articles().len());
        timer.finish_with_threshold(self.timeout / 2);
        Ok(snapshot)
    }
}

#[async_trait]
impl NewsGenerator for XaiGenerator {
    fn name(&self) -> &str {
        "xai"
    }

    async fn generate(&self) -> Result<NewsSnapshot, NewsError> {
        match tokio::time::timeout(self.timeout, self.generate_batch()).await {
            Ok(result) => result,
            Err(_) => Err(NewsError::GenerationTimeout(format!(
                "generation did not finish within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn headlines_prompt(count: usize) -> String {
    format!(
        "Search the web and list {count} of today's most important news stories as headlines. \
         Cover a mix of politics, technology, world affairs, business and culture. \
         Respond with a JSON array only, each element shaped like \
         {{\"id\": \"article-1\", \"title\": \"Headline text\", \"category\": \"Category\"}}, \
         numbering ids article-1 through article-{count}."
    )
}

fn article_prompt(title: &str) -> String {
    format!(
        "Using current web sources, write a concise news article about: \"{title}\". \
         Use a neutral journalistic voice with key facts and context. \
         Keep paragraphs to three or four sentences, separated by blank lines. \
         Return only the article body, no title, at most 800 words."
    )
}

/// Body of the first fenced code block, without its language tag.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let rest = &raw[open + 3..];
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// The first non-empty headline list starting at some `[` in `text`.
/// Citation markers like `[1]` fail to parse and are skipped; anything after
/// the array is ignored.
fn bracketed_headlines(text: &str) -> Option<Vec<RawHeadline>> {
    text.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Vec<RawHeadline>>()
            .next()?
            .ok()
            .filter(|items| !items.is_empty())
    })
}

/// Extracts the JSON array from a model reply (a fenced block is preferred;
/// chatter and citation markers around it are ignored) and normalises ids:
/// missing, blank or repeated ids become `article-N`.
fn parse_headlines(raw: &str, limit: usize) -> Result<Vec<Headline>, NewsError> {
    let parsed = fenced_block(raw)
        .and_then(bracketed_headlines)
        .or_else(|| bracketed_headlines(raw))
        .ok_or_else(|| {
            NewsError::MalformedOutput("headline reply contained no JSON array".to_string())
        })?;

    let mut seen = HashSet::new();
    let mut headlines = Vec::new();

    for (index, item) in parsed.into_iter().take(limit).enumerate() {
        let title = item.title.trim().to_string();
        if title.is_empty() {
            continue;
        }
        let given = match item.id {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let id = if !given.is_empty() && !seen.contains(&given) {
            given
        } else {
            let mut n = index + 1;
            loop {
                let candidate = format!("article-{}", n);
                if !seen.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            }
        };
        seen.insert(id.clone());
        headlines.push(Headline {
            id,
            title,
            category: item
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "News".to_string()),
            published_at: String::new(),
        });
    }

    if headlines.is_empty() {
        return Err(NewsError::MalformedOutput("model returned no headlines".to_string()));
    }
    Ok(headlines)
}
