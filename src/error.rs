use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::routes::ErrorResponse;
use crate::store::{
    StoreError, CATEGORY_SLUG_KEY, CATEGORY_TITLE_KEY, NEWSLETTER_EMAIL_KEY, POST_SLUG_KEY,
};

/// Error type shared by every handler. Converts into `{ error, message? }` JSON.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ApiResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
            AppError::Store(StoreError::UniqueViolation { constraint }) => {
                (StatusCode::CONFLICT, unique_violation_message(constraint))
            }
            AppError::Store(StoreError::PermissionDenied) => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.".to_string(),
            ),
            AppError::Store(StoreError::Unavailable(reason)) => {
                tracing::warn!("Store unavailable: {reason}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database not available".to_string(),
                )
            }
            AppError::Store(StoreError::Database(err)) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        }
    }
}

/// Field a unique violation is about, sent as `message`.
fn conflicting_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        POST_SLUG_KEY | CATEGORY_SLUG_KEY => Some("slug"),
        CATEGORY_TITLE_KEY => Some("title"),
        NEWSLETTER_EMAIL_KEY => Some("email"),
        _ => None,
    }
}

fn unique_violation_message(constraint: &str) -> String {
    match constraint {
        POST_SLUG_KEY => "A post with this slug already exists".to_string(),
        CATEGORY_SLUG_KEY => "A category with this slug already exists".to_string(),
        CATEGORY_TITLE_KEY => "A category with this title already exists".to_string(),
        NEWSLETTER_EMAIL_KEY => "You're already subscribed to our newsletter.".to_string(),
        _ => "This record already exists".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        let message = match &self {
            AppError::Store(StoreError::UniqueViolation { constraint }) => {
                conflicting_field(constraint).map(str::to_string)
            }
            _ => None,
        };
        (status, Json(ErrorResponse { error, message }))
            .into_response()
    }
}
