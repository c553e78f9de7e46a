use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use finfolio_core::errors::CoreError;
use finfolio_core::validation::FormErrors;

/// Error returned by every handler, rendered as `{"error": ..}` JSON.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Field-level form errors, rendered with an extra `fields` object
    Form(FormErrors),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// A price, exchange-rate or news source failed
    Upstream(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Form(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Form(errors) => ApiError::Form(errors),
            CoreError::ValidationError(_) => ApiError::BadRequest(err.to_string()),
            CoreError::Authentication(msg) => ApiError::Unauthorized(msg),
            CoreError::PermissionDenied(msg) => ApiError::Forbidden(msg),
            CoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::Api { .. }
            | CoreError::Network(_)
            | CoreError::NoProvider(_)
            | CoreError::PriceNotAvailable { .. }
            | CoreError::Feed { .. } => ApiError::Upstream(err.to_string()),
            other => {
                tracing::error!(error = %other, "Request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Form(errors) => serde_json::json!({
                "error": format!("Invalid input: {errors}"),
                "fields": errors.fields,
            }),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Upstream(msg)
            | ApiError::Internal(msg) => serde_json::json!({ "error": msg }),
        };
        (status, Json(body)).into_response()
    }
}
