//! Bearer-token authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use propdesk_core::error::CoreError;
use propdesk_core::roles::Role;
use propdesk_core::types::DbId;
use propdesk_db::scope::AccessScope;

use crate::auth::jwt::{validate_token, Claims, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// The caller, taken from a valid access token.
///
/// ```ignore
/// async fn handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role.as_str(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Row visibility for list queries.
    pub fn scope(&self) -> AccessScope {
        AccessScope::for_user(self.role, self.user_id)
    }
}

/// Token from an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Claims from the request's Bearer token when it is present and valid.
pub fn verified_claims(headers: &HeaderMap, config: &JwtConfig) -> Option<Claims> {
    bearer_token(headers).and_then(|token| validate_token(token, config).ok())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.get(header::AUTHORIZATION).is_none() {
            return Err(CoreError::Unauthorized("Missing Authorization header".into()).into());
        }
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            CoreError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| CoreError::Unauthorized("Invalid or expired token".into()))?;
        let role = Role::parse(&claims.role)
            .map_err(|_| CoreError::Unauthorized("Invalid or expired token".into()))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role,
        })
    }
}
