use std::collections::HashSet;

use thiserror::Error;

use aula_core::UserId;

use crate::{Permission, RoleName, permissions_for_roles};

/// A fully resolved caller for permission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<RoleName>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Build a principal from its active role names using the static policy.
    pub fn from_roles(user_id: UserId, roles: Vec<RoleName>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            user_id,
            roles,
            permissions,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Pure permission check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_check() {
        let principal = Principal::from_roles(UserId::new(), vec![RoleName::new("admin")]);
        assert!(authorize(&principal, &Permission::ROLES_MANAGE).is_ok());
        assert!(authorize(&principal, &Permission::new("anything.else")).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let principal = Principal::from_roles(UserId::new(), vec![RoleName::new("student")]);
        let err = authorize(&principal, &Permission::ROLES_MANAGE).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("roles.manage".to_string()));
    }

    #[test]
    fn publisher_may_write_catalog() {
        let principal = Principal::from_roles(UserId::new(), vec![RoleName::new("publisher")]);
        assert!(authorize(&principal, &Permission::CATALOG_WRITE).is_ok());
        assert!(authorize(&principal, &Permission::ROLES_MANAGE).is_err());
    }
}
