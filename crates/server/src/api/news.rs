use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::Utc;
use finfolio_core::models::news::NewsItem;
use finfolio_core::news::page::{
    self, INDEX_LIMIT, NEWS_PAGE_LIMIT, NewsIndex, NewsPage, PER_PAGE,
};
use serde::{Deserialize, Serialize};

use crate::state::{AppState, SharedState};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Kept as text: junk falls back to the first page instead of a 400
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct NewsSearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<NewsItem>,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index))
        .route("/news/index", get(index))
        .route("/news", get(news_page))
        .route("/news/search", get(search))
}

/// Cached items, refreshing the cache first when it is stale.
async fn cached(state: &AppState, limit: usize) -> (Vec<NewsItem>, Option<chrono::DateTime<Utc>>) {
    let mut cache = state.news.lock().await;
    cache.get(&state.fetcher, limit, Utc::now()).await
}

async fn index(State(state): State<SharedState>) -> Json<NewsIndex> {
    let (items, updated_at) = cached(&state, INDEX_LIMIT).await;
    Json(NewsIndex::new(items, updated_at))
}

async fn news_page(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Json<NewsPage> {
    let (items, updated_at) = cached(&state, NEWS_PAGE_LIMIT).await;
    Json(page::paginate(
        &items,
        query.page.as_deref(),
        PER_PAGE,
        updated_at,
    ))
}

async fn search(
    State(state): State<SharedState>,
    Query(query): Query<NewsSearchQuery>,
) -> Json<NewsSearchResponse> {
    let (items, _) = cached(&state, NEWS_PAGE_LIMIT).await;
    let results = page::search_news(&items, &query.q);
    Json(NewsSearchResponse {
        query: query.q.trim().to_string(),
        count: results.len(),
        results,
    })
}
