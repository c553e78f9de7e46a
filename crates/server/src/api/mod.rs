pub mod accounts;
pub mod admin;
pub mod assets;
pub mod error;
pub mod inquiries;
pub mod news;

use axum::{Router, routing::get};

use crate::state::SharedState;

/// All JSON routes. State is attached by the caller.
pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .merge(accounts::router())
        .merge(assets::router())
        .merge(inquiries::router())
        .merge(news::router())
        .merge(admin::router())
}

async fn health_check() -> &'static str {
    "ok"
}
