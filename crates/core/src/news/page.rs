use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::news::NewsItem;

/// Items shown on the landing page.
pub const INDEX_LIMIT: usize = 20;

/// Items loaded for the paginated news page.
pub const NEWS_PAGE_LIMIT: usize = 200;

pub const PER_PAGE: usize = 9;

/// Page links shown on each side of the current page.
pub const PAGE_GROUP: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct NewsIndex {
    pub news_list: Vec<NewsItem>,
    pub updated_at: Option<DateTime<Utc>>,
    pub count: usize,
}

impl NewsIndex {
    pub fn new(items: Vec<NewsItem>, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            count: items.len(),
            news_list: items,
            updated_at,
        }
    }
}

/// One page of the news list: a hero item and the grid below it.
#[derive(Debug, Clone, Serialize)]
pub struct NewsPage {
    pub updated_at: Option<DateTime<Utc>>,
    /// Items on this page
    pub count: usize,
    /// Items across all pages
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub page_numbers: Vec<usize>,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: usize,
    pub next_page: usize,
    pub hero_item: Option<NewsItem>,
    pub grid_items: Vec<NewsItem>,
}

/// Resolve a raw `page` query value: missing or non-numeric → 1,
/// out of range (including 0 and negatives) → last page.
pub fn resolve_page(raw: Option<&str>, total_pages: usize) -> usize {
    let Some(raw) = raw else { return 1 };
    match raw.trim().parse::<i64>() {
        Err(_) => 1,
        Ok(n) if n < 1 || n as u64 > total_pages as u64 => total_pages,
        Ok(n) => n as usize,
    }
}

/// Slice `items` into pages of `per_page`; an empty list still has one (empty) page.
pub fn paginate(
    items: &[NewsItem],
    raw_page: Option<&str>,
    per_page: usize,
    updated_at: Option<DateTime<Utc>>,
) -> NewsPage {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = resolve_page(raw_page, total_pages);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);
    let slice = items.get(start..end).unwrap_or_default();

    let first = page.saturating_sub(PAGE_GROUP).max(1);
    let last = (page + PAGE_GROUP).min(total_pages);

    let has_prev = page > 1;
    let has_next = page < total_pages;

    NewsPage {
        updated_at,
        count: slice.len(),
        total,
        page,
        total_pages,
        page_numbers: (first..=last).collect(),
        has_prev,
        has_next,
        prev_page: if has_prev { page - 1 } else { 1 },
        next_page: if has_next { page + 1 } else { total_pages },
        hero_item: slice.first().cloned(),
        grid_items: slice.iter().skip(1).cloned().collect(),
    }
}

/// Case-insensitive substring search over titles and summaries.
/// A blank query matches nothing.
pub fn search_news(items: &[NewsItem], query: &str) -> Vec<NewsItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&needle)
                || item.summary.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
