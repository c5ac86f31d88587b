//! Request handlers, one module per resource.
//!
//! Handlers validate input with `propdesk_core`, enforce access with the
//! caller's [`PropertyRelation`], call the repositories in `propdesk_db`
//! and publish events after successful writes.

use propdesk_core::access::{can_edit_property, can_view_property, ensure, PropertyRelation};
use propdesk_core::error::CoreError;
use propdesk_core::types::DbId;
use propdesk_db::repositories::PropertyRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod billing;
pub mod blog;
pub mod health;
pub mod inspections;
pub mod jobs;
pub mod notifications;
pub mod properties;
pub mod service_requests;
pub mod units;
pub mod uploads;

/// The caller's relation to a live property.
///
/// Callers with no relation get the same 404 as for a missing property, so
/// ids of other accounts' properties are not confirmed.
pub(crate) async fn visible_property(
    state: &AppState,
    user: &AuthUser,
    property_id: DbId,
) -> AppResult<PropertyRelation> {
    let not_found = || CoreError::NotFound {
        entity: "Property",
        id: property_id,
    };
    let relation = PropertyRepo::relation(&state.pool, property_id, user.user_id)
        .await?
        .ok_or_else(not_found)?;
    if !can_view_property(user.role, &relation) {
        return Err(not_found().into());
    }
    Ok(relation)
}

/// Like [`visible_property`], additionally requiring edit rights.
pub(crate) async fn editable_property(
    state: &AppState,
    user: &AuthUser,
    property_id: DbId,
) -> AppResult<PropertyRelation> {
    let relation = visible_property(state, user, property_id).await?;
    ensure(can_edit_property(user.role, &relation), "edit this property")?;
    Ok(relation)
}

/// A compare-and-set status change matched no row: another request moved
/// the entity first.
pub(crate) fn stale_status(entity: &str) -> CoreError {
    CoreError::Conflict(format!(
        "{entity} status changed concurrently, reload and try again"
    ))
}

/// Trimmed value, `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" a ".into())).as_deref(), Some("a"));
        assert_eq!(non_blank(None), None);
    }
}
