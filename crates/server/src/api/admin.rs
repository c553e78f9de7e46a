use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use finfolio_core::Finfolio;
use finfolio_core::models::money::{AssetClass, Currency};
use finfolio_core::models::report::{HoldingSearchResults, RefreshSummary};
use finfolio_core::providers::traits::QuoteKind;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::CurrentUser;
use crate::state::SharedState;

/// Price classes a batch refresh can be limited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PriceKind {
    Stock,
    Bond,
}

impl From<PriceKind> for QuoteKind {
    fn from(kind: PriceKind) -> Self {
        match kind {
            PriceKind::Stock => QuoteKind::Stock,
            PriceKind::Bond => QuoteKind::Bond,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HoldingsQuery {
    #[serde(default)]
    pub q: String,
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Limit the run to one username
    pub user: Option<String>,
    pub only: Option<PriceKind>,
}

/// Site settings as shown to staff. API keys are listed by provider name only.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub base_currency: Currency,
    pub api_keys: Vec<String>,
    pub providers: ProviderNames,
    pub cached_rates: usize,
}

/// Active quote providers per kind, in fallback order.
#[derive(Debug, Serialize)]
pub struct ProviderNames {
    pub stock: Vec<String>,
    pub bond: Vec<String>,
    pub fx: Vec<String>,
}

impl SettingsView {
    fn of(app: &Finfolio) -> Self {
        let settings = app.get_settings();
        let mut api_keys: Vec<String> = settings.api_keys.keys().cloned().collect();
        api_keys.sort();
        Self {
            base_currency: settings.base_currency,
            api_keys,
            providers: ProviderNames {
                stock: app.get_provider_names(QuoteKind::Stock),
                bond: app.get_provider_names(QuoteKind::Bond),
                fx: app.get_provider_names(QuoteKind::Fx),
            },
            cached_rates: app.cache_total_entries(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub base_currency: Option<Currency>,
    /// Provider name to key; `null` or a blank key removes it
    #[serde(default)]
    pub api_keys: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PruneRequest {
    pub before: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct PruneResponse {
    pub removed: usize,
    pub remaining: usize,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/holdings", get(holdings))
        .route("/admin/prices/refresh", post(refresh_prices))
        .route("/admin/settings", get(settings).patch(update_settings))
        .route("/admin/rates/prune", post(prune_rates))
}

async fn require_staff(state: &SharedState, user: &CurrentUser) -> Result<(), ApiError> {
    if state.app.lock().await.is_staff(user.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Staff only".to_string()))
    }
}

/// Holdings of every user; a blank query lists all of them.
async fn holdings(
    State(state): State<SharedState>,
    user: CurrentUser,
    Query(query): Query<HoldingsQuery>,
) -> Result<Json<HoldingSearchResults>, ApiError> {
    require_staff(&state, &user).await?;
    let kind = match query.kind.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<AssetClass>()?),
    };
    Ok(Json(state.app.lock().await.search_all_holdings(&query.q, kind)))
}

async fn refresh_prices(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshSummary>, ApiError> {
    require_staff(&state, &user).await?;
    let only = req.only.map(QuoteKind::from);
    let summary = state
        .refresh_prices(|app| app.plan_price_update(req.user.as_deref(), only))
        .await?;
    tracing::info!(
        by = user.id,
        target = req.user.as_deref().unwrap_or("all"),
        stocks = summary.stocks_updated,
        bonds = summary.bonds_updated,
        deposits = summary.deposits_snapshotted,
        "Batch price refresh"
    );
    Ok(Json(summary))
}

async fn settings(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<SettingsView>, ApiError> {
    require_staff(&state, &user).await?;
    Ok(Json(SettingsView::of(&*state.app.lock().await)))
}

/// Changing a key rebuilds the provider list straight away.
async fn update_settings(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, ApiError> {
    require_staff(&state, &user).await?;
    let mut app = state.app.lock().await;
    if let Some(currency) = update.base_currency {
        app.set_base_currency(currency);
        tracing::info!(by = user.id, %currency, "Base currency changed");
    }
    for (provider, key) in update.api_keys {
        match key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            Some(key) => {
                app.set_api_key(provider.clone(), key);
                tracing::info!(by = user.id, %provider, "API key set");
            }
            None => {
                if app.remove_api_key(&provider) {
                    tracing::info!(by = user.id, %provider, "API key removed");
                }
            }
        }
    }
    Ok(Json(SettingsView::of(&app)))
}

/// Drop cached exchange rates dated before `before`.
async fn prune_rates(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<PruneRequest>,
) -> Result<Json<PruneResponse>, ApiError> {
    require_staff(&state, &user).await?;
    let mut app = state.app.lock().await;
    let removed = app.cache_prune_before(req.before);
    tracing::info!(by = user.id, before = %req.before, removed, "Exchange rate cache pruned");
    Ok(Json(PruneResponse {
        removed,
        remaining: app.cache_total_entries(),
    }))
}
