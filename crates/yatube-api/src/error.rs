use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use yatube_db::DbError;
use yatube_types::api::ErrorBody;

use crate::middleware::LOGIN_URL;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing group, user, post or follow edge. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// No session on a page that needs one. Redirects to the login page.
    #[error("authentication required")]
    Unauthenticated,

    /// Wrong username or password. HTTP 401.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Input rejected before any write. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Unique key already taken. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Anything else. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Validation(_) => "validation_failed",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => AppError::NotFound(what),
            other => {
                error!("Storage error: {}", other);
                AppError::Internal("storage failure".into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthenticated = self {
            return Redirect::to(LOGIN_URL).into_response();
        }

        let status = self.status_code();
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Fallback for unrouted paths.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no page at {}", uri.path()))
}
