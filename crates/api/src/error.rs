use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use propdesk_core::error::{CoreError, ErrorCode};
use propdesk_storage::StorageError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant renders as `{"error": message, "code": ERROR_CODE}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A lookup by something other than a numeric id (slugs) missed.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// An optional integration (AI, billing webhooks) is not configured
    /// or not reachable.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

const GENERIC_INTERNAL: &str = "An internal error occurred";

impl AppError {
    fn parts(&self) -> (ErrorCode, String) {
        match self {
            AppError::Core(core) => {
                let message = match core {
                    CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
                    CoreError::Validation(msg)
                    | CoreError::Conflict(msg)
                    | CoreError::Unauthorized(msg)
                    | CoreError::Forbidden(msg)
                    | CoreError::LimitExceeded(msg) => msg.clone(),
                    CoreError::InvalidTransition { .. } => core.to_string(),
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        GENERIC_INTERNAL.to_string()
                    }
                };
                (core.code(), message)
            }
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Storage(err) => match err {
                StorageError::InvalidKey(key) => {
                    (ErrorCode::BadRequest, format!("Invalid storage key: {key}"))
                }
                other => {
                    tracing::error!(error = %other, "Storage error");
                    (ErrorCode::InternalError, GENERIC_INTERNAL.to_string())
                }
            },
            AppError::NotFound(msg) => (ErrorCode::NotFound, msg.clone()),
            AppError::BadRequest(msg) => (ErrorCode::BadRequest, msg.clone()),
            AppError::PayloadTooLarge(msg) => (ErrorCode::PayloadTooLarge, msg.clone()),
            AppError::UnsupportedMediaType(msg) => (ErrorCode::UnsupportedMediaType, msg.clone()),
            AppError::ServiceUnavailable(msg) => (ErrorCode::ServiceUnavailable, msg.clone()),
            AppError::RateLimited { .. } => (
                ErrorCode::RateLimited,
                "Too many requests, please try again later".to_string(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (ErrorCode::InternalError, GENERIC_INTERNAL.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = self.parts();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = json!({
            "error": message,
            "code": code.as_str(),
        });
        let mut response = (status, axum::Json(body)).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

/// Map a sqlx error to an error code and client-safe message.
///
/// - `RowNotFound` is 404.
/// - Unique violations (23505) on a `uq_*` constraint are 409.
/// - Foreign-key violations (23503) are 400: the body referenced a row that
///   does not exist.
/// - Anything else is a logged 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (ErrorCode, String) {
    match err {
        sqlx::Error::RowNotFound => (ErrorCode::NotFound, "Resource not found".to_string()),
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => (
                    ErrorCode::Conflict,
                    format!("Duplicate value violates unique constraint: {constraint}"),
                ),
                Some("23503") => (
                    ErrorCode::ValidationError,
                    format!("Referenced record does not exist ({constraint})"),
                ),
                Some("23514") => (
                    ErrorCode::ValidationError,
                    format!("Value rejected by check constraint: {constraint}"),
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    (ErrorCode::InternalError, GENERIC_INTERNAL.to_string())
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (ErrorCode::InternalError, GENERIC_INTERNAL.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_are_conflicts() {
        let err = AppError::Core(CoreError::InvalidTransition {
            entity: "Job",
            from: "COMPLETED".into(),
            to: "OPEN".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn internal_messages_are_not_leaked() {
        let (code, message) = AppError::InternalError("db password wrong".into()).parts();
        assert_eq!(code, ErrorCode::InternalError);
        assert_eq!(message, GENERIC_INTERNAL);
    }

    #[test]
    fn plan_limits_are_forbidden() {
        let response = AppError::Core(CoreError::LimitExceeded("max 1".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn row_not_found_is_404() {
        let (code, _) = AppError::Database(sqlx::Error::RowNotFound).parts();
        assert_eq!(code, ErrorCode::NotFound);
    }
}
