use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Days, NaiveDate, Utc};
use finfolio_core::services::chart_service::ChartService;
use finfolio_core::models::{
    bond::{BondHolding, BondInput},
    chart::ValuePoint,
    deposit::{DepositInput, DepositSaving},
    money::Currency,
    report::{AllocationReport, CategoryList, HoldingSearchResults, PortfolioOverview, RefreshSummary},
    stock::{StockHolding, StockInput},
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::CurrentUser;
use crate::state::SharedState;

/// Window used by the history chart when the request names no dates.
pub const DEFAULT_HISTORY_DAYS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub base_currency: Currency,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub points: Vec<ValuePoint>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/assets", get(overview))
        .route("/assets/allocation", get(allocation))
        .route("/assets/history", get(history))
        .route("/assets/search", get(search))
        .route("/assets/refresh", post(refresh))
        .route("/assets/deposits", get(list_deposits).post(create_deposit))
        .route(
            "/assets/deposits/{id}",
            get(get_deposit).put(update_deposit).delete(delete_deposit),
        )
        .route("/assets/stocks", get(list_stocks).post(create_stock))
        .route(
            "/assets/stocks/{id}",
            get(get_stock).put(update_stock).delete(delete_stock),
        )
        .route("/assets/bonds", get(list_bonds).post(create_bond))
        .route(
            "/assets/bonds/{id}",
            get(get_bond).put(update_bond).delete(delete_bond),
        )
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn overview(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Json<PortfolioOverview> {
    Json(state.app.lock().await.overview(user.id, today()))
}

async fn allocation(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Json<AllocationReport> {
    let today = today();
    let fx = state.fx_table(user.id, today).await;
    Json(state.app.lock().await.allocation_with(user.id, today, &fx))
}

async fn history(
    State(state): State<SharedState>,
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let to = query.to.unwrap_or_else(today);
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_days(Days::new(DEFAULT_HISTORY_DAYS))
            .ok_or_else(|| ApiError::BadRequest("Date out of range".to_string()))?,
    };

    ChartService::check_range(from, to)?;
    let fx = state.fx_table(user.id, to).await;
    let points = state
        .app
        .lock()
        .await
        .value_history_with(user.id, from, to, &fx)?;
    Ok(Json(HistoryResponse {
        base_currency: fx.base(),
        from,
        to,
        points,
    }))
}

async fn search(
    State(state): State<SharedState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Json<HoldingSearchResults> {
    Json(state.app.lock().await.search_holdings(user.id, &query.q))
}

async fn refresh(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<RefreshSummary>, ApiError> {
    let summary = state
        .refresh_prices(|app| app.plan_user_refresh(user.id))
        .await?;
    tracing::info!(
        user_id = user.id,
        stocks = summary.stocks_updated,
        bonds = summary.bonds_updated,
        "Prices refreshed on request"
    );
    Ok(Json(summary))
}

// ── Deposits ────────────────────────────────────────────────────────

async fn list_deposits(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Json<CategoryList<DepositSaving>> {
    Json(state.app.lock().await.deposit_list(user.id, today()))
}

async fn create_deposit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<DepositInput>,
) -> Result<(StatusCode, Json<DepositSaving>), ApiError> {
    let deposit = state.app.lock().await.create_deposit(user.id, input)?;
    Ok((StatusCode::CREATED, Json(deposit)))
}

async fn get_deposit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<DepositSaving>, ApiError> {
    Ok(Json(state.app.lock().await.deposit(user.id, id)?.clone()))
}

async fn update_deposit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(input): Json<DepositInput>,
) -> Result<Json<DepositSaving>, ApiError> {
    Ok(Json(state.app.lock().await.update_deposit(user.id, id, input)?))
}

async fn delete_deposit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.app.lock().await.delete_deposit(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Stocks ──────────────────────────────────────────────────────────

async fn list_stocks(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Json<CategoryList<StockHolding>> {
    Json(state.app.lock().await.stock_list(user.id))
}

async fn create_stock(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<StockInput>,
) -> Result<(StatusCode, Json<StockHolding>), ApiError> {
    let stock = state.app.lock().await.create_stock(user.id, input)?;
    Ok((StatusCode::CREATED, Json(stock)))
}

async fn get_stock(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<StockHolding>, ApiError> {
    Ok(Json(state.app.lock().await.stock(user.id, id)?.clone()))
}

async fn update_stock(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(input): Json<StockInput>,
) -> Result<Json<StockHolding>, ApiError> {
    Ok(Json(state.app.lock().await.update_stock(user.id, id, input)?))
}

async fn delete_stock(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.app.lock().await.delete_stock(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Bonds ───────────────────────────────────────────────────────────

async fn list_bonds(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Json<CategoryList<BondHolding>> {
    Json(state.app.lock().await.bond_list(user.id))
}

async fn create_bond(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<BondInput>,
) -> Result<(StatusCode, Json<BondHolding>), ApiError> {
    let bond = state.app.lock().await.create_bond(user.id, input)?;
    Ok((StatusCode::CREATED, Json(bond)))
}

async fn get_bond(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<BondHolding>, ApiError> {
    Ok(Json(state.app.lock().await.bond(user.id, id)?.clone()))
}

async fn update_bond(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(input): Json<BondInput>,
) -> Result<Json<BondHolding>, ApiError> {
    Ok(Json(state.app.lock().await.update_bond(user.id, id, input)?))
}

async fn delete_bond(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.app.lock().await.delete_bond(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
