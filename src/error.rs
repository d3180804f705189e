use crate::database::DatabaseError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness conflicts
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload exceeds the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Media storage failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// UUID parsing errors
    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(DatabaseError::ConnectionTimeout) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients
    fn client_detail(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::InvalidUuid(e) => format!("Invalid UUID: {}", e),
            AppError::Database(DatabaseError::ConnectionTimeout) => {
                "Service temporarily unavailable".to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(serde_json::json!({ "detail": self.client_detail() }));
        (status, body).into_response()
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type alias for repository operations
pub type RepoResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::Conflict(msg),
            RepositoryError::ConstraintViolation(msg) => AppError::Validation(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    // unique_violation
                    Some("23505") => RepositoryError::Duplicate(db_err.message().to_string()),
                    // foreign_key_violation, check_violation
                    Some("23503") | Some("23514") => {
                        RepositoryError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

/// Body and query extraction failures keep axum's message but use our error body
fn rejection_to_app_error(status: StatusCode, detail: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(detail)
    } else {
        AppError::Validation(detail)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejection_to_app_error(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        rejection_to_app_error(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        rejection_to_app_error(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        rejection_to_app_error(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        rejection_to_app_error(err.status(), err.body_text())
    }
}

/// Convenience function to convert Option<T> to Result<T, AppError>
pub fn option_to_result<T>(opt: Option<T>, error_msg: &str) -> AppResult<T> {
    opt.ok_or_else(|| AppError::NotFound(error_msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Document not found".to_string());
        assert_eq!(err.to_string(), "Resource not found: Document not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_repository_error_mapping() {
        let conflict: AppError = RepositoryError::Duplicate("tags_name_key".into()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let invalid: AppError = RepositoryError::ConstraintViolation("fk".into()).into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let missing: AppError = RepositoryError::from(SqlxError::RowNotFound).into();
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = AppError::Storage("disk full at /var/media".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_detail(), "Internal server error");

        let err = AppError::Forbidden("You do not have permission to perform this action.".into());
        assert_eq!(
            err.client_detail(),
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn test_connection_timeout_is_unavailable() {
        let err = AppError::Database(DatabaseError::ConnectionTimeout);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
