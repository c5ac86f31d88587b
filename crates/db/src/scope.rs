//! Tenant isolation for list queries.
//!
//! An [`AccessScope`] renders a SQL predicate over a property id column.
//! The scoped user's id is always bound as one parameter; the unrestricted
//! scope binds `NULL` so the placeholder keeps a known type.

use propdesk_core::roles::Role;
use propdesk_core::types::DbId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Admins see everything.
    All,
    /// Properties the user manages.
    Managed(DbId),
    /// Properties the user co-owns.
    Owned(DbId),
    /// Properties containing a unit the user rents.
    Tenant(DbId),
    /// Properties where the user holds a job.
    Technician(DbId),
}

impl AccessScope {
    pub fn for_user(role: Role, user_id: DbId) -> Self {
        match role {
            Role::Admin => Self::All,
            Role::PropertyManager => Self::Managed(user_id),
            Role::Owner => Self::Owned(user_id),
            Role::Tenant => Self::Tenant(user_id),
            Role::Technician => Self::Technician(user_id),
        }
    }

    /// Value to bind for the scope's placeholder.
    pub fn bind_value(&self) -> Option<DbId> {
        match *self {
            Self::All => None,
            Self::Managed(id) | Self::Owned(id) | Self::Tenant(id) | Self::Technician(id) => {
                Some(id)
            }
        }
    }

    /// Predicate restricting `property_col` to properties visible in this
    /// scope, using placeholder `$param`.
    pub fn property_predicate(&self, property_col: &str, param: usize) -> String {
        match self {
            Self::All => format!("${param}::BIGINT IS NULL"),
            Self::Managed(_) => format!(
                "{property_col} IN (SELECT id FROM properties WHERE manager_id = ${param})"
            ),
            Self::Owned(_) => format!(
                "{property_col} IN (SELECT property_id FROM property_owners WHERE owner_id = ${param})"
            ),
            Self::Tenant(_) => format!(
                "{property_col} IN (SELECT property_id FROM units WHERE tenant_id = ${param})"
            ),
            Self::Technician(_) => format!(
                "{property_col} IN (SELECT property_id FROM jobs \
                 WHERE assigned_to = ${param} AND archived_at IS NULL)"
            ),
        }
    }

    /// Predicate for job lists. Technicians see only jobs assigned to them,
    /// not every job on the property.
    pub fn job_predicate(&self, alias: &str, param: usize) -> String {
        match self {
            Self::Technician(_) => format!("{alias}.assigned_to = ${param}"),
            _ => self.property_predicate(&format!("{alias}.property_id"), param),
        }
    }

    /// Predicate for service request lists. Tenants see only their own
    /// requests.
    pub fn service_request_predicate(&self, alias: &str, param: usize) -> String {
        match self {
            Self::Tenant(_) => format!("{alias}.requested_by = ${param}"),
            _ => self.property_predicate(&format!("{alias}.property_id"), param),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_roles_to_scopes() {
        assert_eq!(AccessScope::for_user(Role::Admin, 7), AccessScope::All);
        assert_eq!(
            AccessScope::for_user(Role::PropertyManager, 7),
            AccessScope::Managed(7)
        );
        assert_eq!(AccessScope::All.bind_value(), None);
        assert_eq!(AccessScope::Tenant(3).bind_value(), Some(3));
    }

    #[test]
    fn predicates_use_the_requested_placeholder() {
        let p = AccessScope::Managed(1).property_predicate("p.id", 4);
        assert_eq!(
            p,
            "p.id IN (SELECT id FROM properties WHERE manager_id = $4)"
        );
        assert_eq!(AccessScope::All.property_predicate("p.id", 2), "$2::BIGINT IS NULL");
    }

    #[test]
    fn technicians_and_tenants_get_narrower_predicates() {
        assert_eq!(
            AccessScope::Technician(1).job_predicate("j", 1),
            "j.assigned_to = $1"
        );
        assert_eq!(
            AccessScope::Tenant(1).service_request_predicate("sr", 3),
            "sr.requested_by = $3"
        );
        assert!(AccessScope::Owned(1)
            .job_predicate("j", 1)
            .starts_with("j.property_id IN"));
    }
}
