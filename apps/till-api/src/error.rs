//! # API Error Type
//!
//! What HTTP clients see when an operation fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  handler ──► repository ──► Err(DbError)                                │
//! │                                  │                                      │
//! │                                  ▼  DbError::kind()                     │
//! │   Validation  → 400 VALIDATION_ERROR                                    │
//! │   NotFound    → 404 NOT_FOUND                                           │
//! │   Conflict    → 409 CONFLICT                                            │
//! │   Persistence → 500 PERSISTENCE_FAILURE (503 when busy or timed out)    │
//! │   RolledBack  → 500 ROLLED_BACK, message names the original failure     │
//! │                                                                         │
//! │  body: {"code": "NOT_FOUND", "message": "Member not found: M404"}       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use till_db::{DbError, ErrorKind};

/// API error returned from every handler.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,

    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Duplicate SKU, transaction or member identifier (409)
    Conflict,

    /// Storage unavailable or rejected the write (500/503)
    PersistenceFailure,

    /// A multi-step write failed part way and was undone (500)
    RolledBack,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err.kind() {
            ErrorKind::Validation => ApiError::validation(err.to_string()),
            ErrorKind::NotFound => {
                ApiError::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, err.to_string())
            }
            ErrorKind::Conflict => {
                ApiError::new(StatusCode::CONFLICT, ErrorCode::Conflict, err.to_string())
            }
            ErrorKind::RolledBack => {
                tracing::warn!(error = %err, "Request rolled back");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::RolledBack,
                    err.to_string(),
                )
            }
            ErrorKind::Persistence => match err {
                DbError::PoolExhausted | DbError::Timeout { .. } | DbError::Busy(_) => {
                    tracing::warn!(error = %err, "Storage unavailable");
                    ApiError::new(
                        StatusCode::SERVICE_UNAVAILABLE,
                        ErrorCode::PersistenceFailure,
                        err.to_string(),
                    )
                }
                DbError::QueryFailed(_) | DbError::Internal(_) => {
                    // Log the actual error but return a generic message
                    tracing::error!(error = %err, "Database operation failed");
                    ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::PersistenceFailure,
                        "Database operation failed",
                    )
                }
                other => {
                    tracing::error!(error = %other, "Persistence failure");
                    ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::PersistenceFailure,
                        other.to_string(),
                    )
                }
            },
        }
    }
}

/// Malformed JSON, wrong types and fractional quantities are validation
/// failures, not 422s.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{CoreError, ValidationError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                DbError::from(ValidationError::required("reason")),
                StatusCode::BAD_REQUEST,
                ErrorCode::ValidationError,
            ),
            (
                DbError::not_found("Member", "M404"),
                StatusCode::NOT_FOUND,
                ErrorCode::NotFound,
            ),
            (
                DbError::duplicate("transactionId", "TX-1"),
                StatusCode::CONFLICT,
                ErrorCode::Conflict,
            ),
            (
                DbError::PoolExhausted,
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::PersistenceFailure,
            ),
            (
                DbError::Internal("disk I/O error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::PersistenceFailure,
            ),
            (
                DbError::RolledBack {
                    operation: "commit_sale".to_string(),
                    writes: 3,
                    source: Box::new(DbError::ForeignKeyViolation {
                        message: "FOREIGN KEY constraint failed".to_string(),
                    }),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::RolledBack,
            ),
        ];

        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }

    #[test]
    fn test_rolled_back_message_names_the_cause() {
        let api = ApiError::from(DbError::RolledBack {
            operation: "commit_sale".to_string(),
            writes: 1,
            source: Box::new(DbError::from(CoreError::InsufficientStock {
                sku: "RICE-5KG".to_string(),
                available: 1,
                requested: 2,
            })),
        });
        assert!(api.message.contains("RICE-5KG"));
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let api = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(api.message, "Database operation failed");
    }

    #[test]
    fn test_body_shape() {
        let json = serde_json::to_value(ApiError::not_found("Item", "abc")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Item not found: abc");
        assert!(json.get("status").is_none());
    }
}
