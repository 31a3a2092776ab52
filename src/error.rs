use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the services. Every variant maps to exactly one
/// status code at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("email must be a gmail.com or .in address")]
    InvalidEmail,
    #[error("invalid value for parameter {0}")]
    InvalidParameter(&'static str),
    #[error("user already exists")]
    DuplicateUser,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidEmail
            | AppError::InvalidParameter(_)
            | AppError::DuplicateUser => StatusCode::BAD_REQUEST,
            AppError::UserNotFound | AppError::InvalidCredentials | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Login failures share one message so the
    /// response does not reveal whether the account exists.
    fn public_message(&self) -> String {
        match self {
            AppError::UserNotFound | AppError::InvalidCredentials => {
                "Invalid credentials".to_string()
            }
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);
        if unique_violation {
            return AppError::DuplicateUser;
        }
        AppError::Internal(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

// Body rejections are client input errors
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Internal(cause) => tracing::error!(%cause, "request failed"),
            other => tracing::debug!(error = %other, %status, "request rejected"),
        }

        let body = json!({
            "success": false,
            "message": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}
