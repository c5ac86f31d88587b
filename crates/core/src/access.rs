//! Tenant-isolation rules.
//!
//! Handlers resolve how the caller relates to a property (manager, owner,
//! tenant of a unit, technician holding a job) into a [`PropertyRelation`]
//! and ask these predicates whether the action is allowed. Admins pass every
//! check.

use crate::error::CoreError;
use crate::roles::Role;

/// How the calling user relates to one property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyRelation {
    pub is_manager: bool,
    pub is_owner: bool,
    pub is_tenant: bool,
    pub is_assigned_technician: bool,
}

impl PropertyRelation {
    pub fn is_related(&self) -> bool {
        self.is_manager || self.is_owner || self.is_tenant || self.is_assigned_technician
    }
}

/// Only property managers (and admins) create and run properties.
pub fn can_manage_properties(role: Role) -> bool {
    matches!(role, Role::Admin | Role::PropertyManager)
}

pub fn can_view_property(role: Role, rel: &PropertyRelation) -> bool {
    role == Role::Admin || rel.is_related()
}

/// Edit rights cover the property record, its units, inspections and jobs.
pub fn can_edit_property(role: Role, rel: &PropertyRelation) -> bool {
    role == Role::Admin || (role == Role::PropertyManager && rel.is_manager)
}

/// Tenants file requests for the property they live in; owners and the
/// manager may file on the tenant's behalf.
pub fn can_submit_service_request(role: Role, rel: &PropertyRelation) -> bool {
    match role {
        Role::Admin => true,
        Role::PropertyManager => rel.is_manager,
        Role::Owner => rel.is_owner,
        Role::Tenant => rel.is_tenant,
        Role::Technician => false,
    }
}

/// Job progress may be reported by the manager or the assigned technician.
pub fn can_update_job_progress(role: Role, rel: &PropertyRelation, is_assignee: bool) -> bool {
    can_edit_property(role, rel) || (role == Role::Technician && is_assignee)
}

/// Turn a boolean permission check into a `Forbidden` error.
pub fn ensure(allowed: bool, action: &str) -> Result<(), CoreError> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!("Not allowed to {action}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PropertyRelation {
        PropertyRelation {
            is_manager: true,
            ..Default::default()
        }
    }

    fn tenant() -> PropertyRelation {
        PropertyRelation {
            is_tenant: true,
            ..Default::default()
        }
    }

    #[test]
    fn admin_passes_without_relation() {
        let none = PropertyRelation::default();
        assert!(can_view_property(Role::Admin, &none));
        assert!(can_edit_property(Role::Admin, &none));
        assert!(can_submit_service_request(Role::Admin, &none));
    }

    #[test]
    fn unrelated_manager_cannot_view() {
        let none = PropertyRelation::default();
        assert!(!can_view_property(Role::PropertyManager, &none));
        assert!(!can_edit_property(Role::PropertyManager, &none));
    }

    #[test]
    fn tenant_views_but_does_not_edit() {
        assert!(can_view_property(Role::Tenant, &tenant()));
        assert!(!can_edit_property(Role::Tenant, &tenant()));
        assert!(can_submit_service_request(Role::Tenant, &tenant()));
    }

    #[test]
    fn owner_cannot_edit_even_if_related() {
        let owner = PropertyRelation {
            is_owner: true,
            ..Default::default()
        };
        assert!(can_view_property(Role::Owner, &owner));
        assert!(!can_edit_property(Role::Owner, &owner));
    }

    #[test]
    fn technician_progress_requires_assignment() {
        let tech = PropertyRelation {
            is_assigned_technician: true,
            ..Default::default()
        };
        assert!(can_update_job_progress(Role::Technician, &tech, true));
        assert!(!can_update_job_progress(Role::Technician, &tech, false));
        assert!(can_update_job_progress(Role::PropertyManager, &manager(), false));
        assert!(!can_submit_service_request(Role::Technician, &tech));
    }

    #[test]
    fn ensure_maps_to_forbidden() {
        assert!(ensure(true, "x").is_ok());
        let err = ensure(false, "edit this property").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(msg) if msg.contains("edit this property")));
    }
}
