//! Financial news: RSS ingestion, preview-image scraping, caching and paging.

pub mod cache;
pub mod feed;
pub mod page;
pub mod scrape;
pub mod text;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::news::NewsItem;

/// Some publishers reject the default client user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// News pipeline settings (the `[news]` section of the server config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub feeds: Vec<String>,
    /// Shown as the `source` of every item
    pub source_label: String,
    pub ttl_secs: u64,
    pub limit_per_feed: usize,
    /// Look up `og:image` on the article page when the feed has no image
    pub scrape_og_image: bool,
    /// Page scrapes allowed per refresh
    pub scrape_limit: usize,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: vec!["https://kr.investing.com/rss/news.rss".to_string()],
            source_label: "Investing.com".to_string(),
            ttl_secs: 600,
            limit_per_feed: 120,
            scrape_og_image: true,
            scrape_limit: 8,
            timeout_secs: 6,
        }
    }
}

/// Downloads and merges the configured feeds.
pub struct NewsFetcher {
    client: Client,
    config: NewsConfig,
}

impl NewsFetcher {
    pub fn new(config: NewsConfig) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| CoreError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Fetch every configured feed.
    pub async fn fetch_all(&self) -> Vec<NewsItem> {
        self.fetch_many(
            &self.config.feeds,
            self.config.limit_per_feed,
            self.config.scrape_og_image,
            self.config.scrape_limit,
        )
        .await
    }

    /// Fetch `urls`, fill missing images from article pages (at most
    /// `scrape_limit` attempts in total), and sort newest first.
    /// Feeds that fail are logged and skipped.
    pub async fn fetch_many(
        &self,
        urls: &[String],
        limit_per_feed: usize,
        scrape: bool,
        scrape_limit: usize,
    ) -> Vec<NewsItem> {
        let mut items = Vec::new();
        let mut tried = 0;

        for url in urls {
            let mut entries = match self.fetch_feed(url, limit_per_feed).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping news feed");
                    continue;
                }
            };

            for item in entries.iter_mut() {
                if item.img.is_some() || !scrape || tried >= scrape_limit {
                    continue;
                }
                let Some(link) = item.link.clone() else { continue };
                tried += 1;
                item.img = scrape::scrape_preview_image(&self.client, &link).await;
            }
            items.append(&mut entries);
        }

        feed::sort_newest_first(&mut items);
        items
    }

    async fn fetch_feed(&self, url: &str, limit: usize) -> Result<Vec<NewsItem>, CoreError> {
        let feed_error = |message: String| CoreError::Feed {
            url: url.to_string(),
            message,
        };

        let resp = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/rss+xml, application/xml, text/xml, */*")
            .send()
            .await
            .map_err(|e| feed_error(e.without_url().to_string()))?;
        if !resp.status().is_success() {
            return Err(feed_error(format!("HTTP {}", resp.status())));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| feed_error(e.without_url().to_string()))?;

        feed::parse_feed(url, &body, &self.config.source_label, limit)
    }
}
