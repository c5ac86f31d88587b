use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A status change that the entity's lifecycle does not allow.
    #[error("Invalid {entity} status transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The caller's subscription plan does not allow the operation.
    #[error("Plan limit reached: {0}")]
    LimitExceeded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error codes returned in the `code` field of every error
/// response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    Conflict,
    Unauthorized,
    Forbidden,
    InvalidStatusTransition,
    PlanLimitReached,
    RateLimited,
    PayloadTooLarge,
    UnsupportedMediaType,
    ServiceUnavailable,
    BadRequest,
    InternalError,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            Self::PlanLimitReached => "PLAN_LIMIT_REACHED",
            Self::RateLimited => "RATE_LIMITED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code conventionally paired with this error code.
    pub fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::ValidationError | Self::BadRequest => 400,
            Self::Conflict | Self::InvalidStatusTransition => 409,
            Self::Unauthorized => 401,
            Self::Forbidden | Self::PlanLimitReached => 403,
            Self::RateLimited => 429,
            Self::PayloadTooLarge => 413,
            Self::UnsupportedMediaType => 415,
            Self::ServiceUnavailable => 503,
            Self::InternalError => 500,
        }
    }
}

impl CoreError {
    /// The error code a client sees for this domain error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            Self::LimitExceeded(_) => ErrorCode::PlanLimitReached,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}
