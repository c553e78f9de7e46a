use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use finfolio_core::models::user::{
    PasswordChangeInput, PasswordResetInput, Profile, ProfileInput, SignupInput,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::CurrentUser;
use crate::state::{SharedState, run_password_job};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: Profile,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/accounts/signup", post(signup))
        .route("/accounts/login", post(login))
        .route("/accounts/logout", post(logout))
        .route("/accounts/profile", get(profile).patch(update_profile))
        .route("/accounts/delete", post(delete_account))
        .route("/accounts/password", post(change_password))
        .route("/accounts/password/reset", post(reset_password))
}

/// Register and sign in straight away.
async fn signup(
    State(state): State<SharedState>,
    Json(input): Json<SignupInput>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let job = state.app.lock().await.prepare_register(&input)?;
    let outcome = run_password_job(job).await?;
    let user = state.app.lock().await.finish_register(&input, outcome)?;
    let token = state.sessions()?.create(user.id, Utc::now());
    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let job = state
        .app
        .lock()
        .await
        .prepare_login(&req.username, &req.password)?;
    let outcome = run_password_job(job).await?;
    let user = state.app.lock().await.finish_login(&req.username, outcome)?;
    let token = state.sessions()?.create(user.id, Utc::now());
    tracing::debug!(user_id = user.id, "Session started");
    Ok(Json(SessionResponse { token, user }))
}

async fn logout(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.sessions()?.revoke(&user.token);
    Ok(StatusCode::NO_CONTENT)
}

async fn profile(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.app.lock().await.profile(user.id)?))
}

async fn update_profile(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<ProfileInput>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.app.lock().await.update_profile(user.id, input)?))
}

/// Other sessions of the user are signed out; this one stays.
async fn change_password(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(input): Json<PasswordChangeInput>,
) -> Result<StatusCode, ApiError> {
    let job = state
        .app
        .lock()
        .await
        .prepare_change_password(user.id, &input)?;
    let outcome = run_password_job(job).await?;
    state
        .app
        .lock()
        .await
        .finish_change_password(user.id, &input, outcome)?;
    state.sessions()?.revoke_user(user.id, Some(&user.token));
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_password(
    State(state): State<SharedState>,
    Json(input): Json<PasswordResetInput>,
) -> Result<StatusCode, ApiError> {
    let job = state.app.lock().await.prepare_reset_password(&input)?;
    let outcome = run_password_job(job).await?;
    let user_id = state
        .app
        .lock()
        .await
        .finish_reset_password(&input, outcome)?;
    state.sessions()?.revoke_user(user_id, None);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<StatusCode, ApiError> {
    let job = state
        .app
        .lock()
        .await
        .prepare_delete_account(user.id, &req.password)?;
    let outcome = run_password_job(job).await?;
    state
        .app
        .lock()
        .await
        .finish_delete_account(user.id, outcome)?;
    state.sessions()?.revoke_user(user.id, None);
    Ok(StatusCode::NO_CONTENT)
}
