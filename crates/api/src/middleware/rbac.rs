//! Role gates built on [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use propdesk_core::access::can_manage_properties;
use propdesk_core::error::CoreError;
use propdesk_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(CoreError::Forbidden("Admin role required".into()).into());
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires a role that manages properties: `property_manager` or `admin`.
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_manage_properties(user.role) {
            return Err(
                CoreError::Forbidden("Property manager or Admin role required".into()).into(),
            );
        }
        Ok(RequireManager(user))
    }
}
