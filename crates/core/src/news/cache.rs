use chrono::{DateTime, Duration, Utc};

use super::NewsFetcher;
use crate::models::news::NewsItem;

/// In-memory news cache with a time-to-live.
///
/// A failed refresh still counts as a refresh: the (possibly empty) result is
/// stored so a dead feed is not hammered on every request.
pub struct NewsCache {
    items: Vec<NewsItem>,
    fetched_at: Option<DateTime<Utc>>,
    ttl: Duration,
}

impl NewsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            fetched_at: None,
            ttl,
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            None => true,
            Some(at) => now - at > self.ttl,
        }
    }

    /// Replace the cached items, e.g. after an out-of-band fetch.
    pub fn store(&mut self, items: Vec<NewsItem>, now: DateTime<Utc>) {
        self.items = items;
        self.fetched_at = Some(now);
    }

    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Up to `limit` items, refreshing first when stale.
    pub async fn get(
        &mut self,
        fetcher: &NewsFetcher,
        limit: usize,
        now: DateTime<Utc>,
    ) -> (Vec<NewsItem>, Option<DateTime<Utc>>) {
        if self.is_stale(now) {
            let items = fetcher.fetch_all().await;
            tracing::info!(count = items.len(), "News cache refreshed");
            self.store(items, now);
        }
        (self.peek(limit), self.fetched_at)
    }

    /// Cached items without refreshing.
    pub fn peek(&self, limit: usize) -> Vec<NewsItem> {
        self.items.iter().take(limit).cloned().collect()
    }
}
