//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::storage::StorageError;

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// Claim admission refused (expired challenge or bad signature).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ExpiredChallenge { .. } | LedgerError::InvalidSignature => {
                AppError::Unauthorized(e.to_string())
            }
            LedgerError::MalformedChallenge(_) => AppError::Validation(e.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Internal(format!("persist failed: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_status() {
        let status = |e: LedgerError| AppError::from(e).into_response().status();
        assert_eq!(
            status(LedgerError::ExpiredChallenge {
                elapsed: 301,
                window: 300
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(LedgerError::InvalidSignature), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(LedgerError::MalformedChallenge("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn storage_errors_are_internal() {
        let e = AppError::from(StorageError::Poisoned);
        assert!(e.to_string().contains("persist failed"));
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
