use serde::{Deserialize, Serialize};

/// One article pulled from a news feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: Option<String>,
    pub summary: String,
    /// Publication date as it appeared in the feed
    pub published: String,
    /// Publication time as unix seconds (UTC), used for ordering
    pub ts: Option<i64>,
    pub source: String,
    pub img: Option<String>,
}
