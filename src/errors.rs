use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

use crate::auth::provider::AuthError;
use crate::store::StoreError;

/// JSON error body returned by every API endpoint.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    Validation(String),
    NotFound(&'static str),
    Forbidden(String),
    InvalidState(String),
    Conflict(String),
    Store(StoreError),
    Auth(AuthError),
    Session(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Validation(msg) => write!(f, "{msg}"),
            AppError::NotFound(what) => write!(f, "{what} not found"),
            AppError::Forbidden(msg) => write!(f, "{msg}"),
            AppError::InvalidState(msg) => write!(f, "{msg}"),
            AppError::Conflict(msg) => write!(f, "{msg}"),
            AppError::Store(e) => write!(f, "Store error: {e}"),
            AppError::Auth(e) => write!(f, "Auth provider error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// True for failures the caller caused, as opposed to infrastructure faults.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Store(_) | AppError::Auth(_) | AppError::Session(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::InvalidState(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Auth(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = if self.is_client_error() {
            self.to_string()
        } else {
            log::error!("{self}");
            "An unexpected error occurred".to_string()
        };
        HttpResponse::build(self.status_code()).json(ApiErrorResponse { error })
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}
