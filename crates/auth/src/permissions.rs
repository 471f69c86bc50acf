use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::roles::RoleName;

/// Permission identifier.
///
/// Permissions gate whole operations ("may this caller manage roles?"). What
/// a caller may see or send within an operation is the job of [`crate::Rule`].
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const ROLES_MANAGE: Permission = Permission(Cow::Borrowed("roles.manage"));
    pub const CATALOG_WRITE: Permission = Permission(Cow::Borrowed("catalog.write"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role to permission policy.
///
/// Unknown roles grant nothing beyond what their rules allow.
pub fn permissions_for_roles<'a, I>(roles: I) -> Vec<Permission>
where
    I: IntoIterator<Item = &'a RoleName>,
{
    let mut out = BTreeSet::new();
    for role in roles {
        match role.as_str() {
            RoleName::ADMIN => {
                out.insert(Permission::WILDCARD);
            }
            RoleName::PUBLISHER => {
                out.insert(Permission::CATALOG_WRITE);
            }
            _ => {}
        }
    }
    out.into_iter().collect()
}
