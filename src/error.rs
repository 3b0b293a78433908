use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, TransactionError};
use serde_json::json;

use crate::auth::user::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("Not authorized to access this resource".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TransactionError<ApiError>> for ApiError {
    fn from(err: TransactionError<ApiError>) -> Self {
        match err {
            TransactionError::Connection(e) => Self::Database(e),
            TransactionError::Transaction(e) => e,
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Seaorm(e) => Self::Database(e),
            BackendError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            BackendError::UnverifiedEmail => Self::Unauthorized(err.to_string()),
            BackendError::UnknownUser => Self::Unauthorized(err.to_string()),
            BackendError::Token(_) => Self::Unauthorized("Not authorized to access this route".into()),
            BackendError::Hashing(msg) => Self::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("Orphan").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Database(DbErr::Custom("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(ApiError::not_found("Campaign").to_string(), "Campaign not found");
    }

    #[test]
    fn transaction_errors_unwrap_to_inner_error() {
        let err: ApiError = TransactionError::Transaction(ApiError::Conflict("busy".into())).into();
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "busy"));
    }
}
