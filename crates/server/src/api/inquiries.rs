use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use finfolio_core::Finfolio;
use finfolio_core::models::inquiry::{Inquiry, InquiryInput};
use serde::Serialize;

use super::error::ApiError;
use crate::auth::CurrentUser;
use crate::state::SharedState;

/// An inquiry with its author's nickname attached.
#[derive(Debug, Serialize)]
pub struct InquiryView {
    #[serde(flatten)]
    pub inquiry: Inquiry,
    pub author: Option<String>,
}

impl InquiryView {
    fn of(app: &Finfolio, inquiry: &Inquiry) -> Self {
        Self {
            inquiry: inquiry.clone(),
            author: app.db().user(inquiry.author_id).map(|u| u.nickname.clone()),
        }
    }
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/inquiries", get(list_mine).post(write))
        .route("/inquiries/all", get(list_all))
        .route(
            "/inquiries/{id}",
            get(detail).put(update).delete(delete),
        )
        .route("/inquiries/{id}/delete", post(delete))
}

async fn write(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<InquiryInput>,
) -> Result<(StatusCode, Json<InquiryView>), ApiError> {
    let mut app = state.app.lock().await;
    let inquiry = app.write_inquiry(user.id, input)?;
    Ok((StatusCode::CREATED, Json(InquiryView::of(&app, &inquiry))))
}

/// Every inquiry, newest first. Readable without signing in.
async fn list_all(State(state): State<SharedState>) -> Json<Vec<InquiryView>> {
    let app = state.app.lock().await;
    Json(
        app.inquiries()
            .into_iter()
            .map(|i| InquiryView::of(&app, i))
            .collect(),
    )
}

async fn list_mine(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Json<Vec<InquiryView>> {
    let app = state.app.lock().await;
    Json(
        app.inquiries_by(user.id)
            .into_iter()
            .map(|i| InquiryView::of(&app, i))
            .collect(),
    )
}

async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<InquiryView>, ApiError> {
    let app = state.app.lock().await;
    let inquiry = app.inquiry(id)?;
    Ok(Json(InquiryView::of(&app, inquiry)))
}

async fn update(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(input): Json<InquiryInput>,
) -> Result<Json<InquiryView>, ApiError> {
    let mut app = state.app.lock().await;
    let inquiry = app.update_inquiry(user.id, id, input)?;
    Ok(Json(InquiryView::of(&app, &inquiry)))
}

async fn delete(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.app.lock().await.delete_inquiry(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
