//! Well-known role names.
//!
//! These must match the `chk_users_role` constraint in the initial schema
//! migration.

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PROPERTY_MANAGER: &str = "property_manager";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_TENANT: &str = "tenant";
pub const ROLE_TECHNICIAN: &str = "technician";

/// Typed view of a user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    PropertyManager,
    Owner,
    Tenant,
    Technician,
}

/// Roles a visitor may pick at self-service registration. Admins are
/// provisioned by other admins only.
pub const SELF_SERVICE_ROLES: &[Role] = &[
    Role::PropertyManager,
    Role::Owner,
    Role::Tenant,
    Role::Technician,
];

impl Role {
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_PROPERTY_MANAGER => Ok(Self::PropertyManager),
            ROLE_OWNER => Ok(Self::Owner),
            ROLE_TENANT => Ok(Self::Tenant),
            ROLE_TECHNICIAN => Ok(Self::Technician),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::PropertyManager => ROLE_PROPERTY_MANAGER,
            Self::Owner => ROLE_OWNER,
            Self::Tenant => ROLE_TENANT,
            Self::Technician => ROLE_TECHNICIAN,
        }
    }

    pub fn is_self_service(self) -> bool {
        SELF_SERVICE_ROLES.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in [
            Role::Admin,
            Role::PropertyManager,
            Role::Owner,
            Role::Tenant,
            Role::Technician,
        ] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn admin_is_not_self_service() {
        assert!(!Role::Admin.is_self_service());
        assert!(Role::Tenant.is_self_service());
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::parse("landlord").is_err());
    }
}
