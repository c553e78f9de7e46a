use chrono::{DateTime, NaiveDateTime};
use rss::{Channel, Item};

use super::text::clean_text;
use crate::errors::CoreError;
use crate::models::news::NewsItem;

/// Parse an RSS document into news items, keeping feed order.
///
/// Images are taken from the feed only; page scraping happens later.
pub fn parse_feed(
    url: &str,
    body: &[u8],
    source: &str,
    limit: usize,
) -> Result<Vec<NewsItem>, CoreError> {
    let channel = Channel::read_from(body).map_err(|e| CoreError::Feed {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    Ok(channel
        .items()
        .iter()
        .take(limit)
        .map(|item| entry_to_news(item, source))
        .collect())
}

fn entry_to_news(item: &Item, source: &str) -> NewsItem {
    let published = item
        .pub_date()
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().first())
                .map(String::as_str)
        })
        .or_else(|| extension_value(item, "dc", "date"))
        .unwrap_or_default()
        .trim()
        .to_string();

    NewsItem {
        title: clean_text(item.title().unwrap_or_default()),
        link: item
            .link()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
        summary: extract_summary(item),
        ts: parse_timestamp(&published),
        published,
        source: source.to_string(),
        img: feed_image(item),
    }
}

/// First non-empty cleaned text out of description, then content.
pub fn extract_summary(item: &Item) -> String {
    [item.description(), item.content()]
        .into_iter()
        .flatten()
        .map(clean_text)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Image from feed metadata: `media:content`, `media:thumbnail`, then an image enclosure.
pub fn feed_image(item: &Item) -> Option<String> {
    for name in ["content", "thumbnail"] {
        let found = item
            .extensions()
            .get("media")
            .and_then(|media| media.get(name))
            .and_then(|exts| {
                exts.iter()
                    .filter_map(|ext| ext.attrs().get("url"))
                    .map(|u| u.trim())
                    .find(|u| !u.is_empty())
            });
        if let Some(url) = found {
            return Some(url.to_string());
        }
    }

    item.enclosure()
        .filter(|enc| enc.mime_type().contains("image"))
        .map(|enc| enc.url().trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn extension_value<'a>(item: &'a Item, prefix: &str, name: &str) -> Option<&'a str> {
    item.extensions()
        .get(prefix)?
        .get(name)?
        .iter()
        .find_map(|ext| ext.value())
}

/// Publication time as unix seconds (UTC).
///
/// Accepts RFC 2822 (standard RSS), RFC 3339 (Dublin Core) and the bare
/// `YYYY-MM-DD HH:MM:SS` some publishers emit, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Items with a timestamp first, newest first; undated items keep their order.
pub fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by_key(|item| (item.ts.is_none(), std::cmp::Reverse(item.ts.unwrap_or(0))));
}
