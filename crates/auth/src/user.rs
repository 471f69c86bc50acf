//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aula_core::{DomainError, DomainResult, Entity, UserId};

use crate::roles::{RoleName, RoleSummary};

/// Persisted user document.
///
/// Roles are an ordered list of summaries; the order defines the order in
/// which role rules are concatenated into the user's rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<RoleSummary>,
    pub created_at: DateTime<Utc>,
}

impl Entity for UserAccount {
    type Id = UserId;
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl UserAccount {
    pub fn new(input: NewUser, password_hash: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email: input.email,
            username: input.username,
            name: input.name,
            password_hash,
            roles: Vec::new(),
            created_at,
        }
    }

    pub fn has_role(&self, name: &RoleName) -> bool {
        self.roles.iter().any(|r| &r.name == name)
    }

    /// Returns `false` when the role was already held (the stored summary is refreshed).
    pub fn assign_role(&mut self, summary: RoleSummary) -> bool {
        if let Some(existing) = self.roles.iter_mut().find(|r| r.name == summary.name) {
            *existing = summary;
            return false;
        }
        self.roles.push(summary);
        true
    }

    pub fn remove_role(&mut self, name: &RoleName) -> bool {
        let before = self.roles.len();
        self.roles.retain(|r| &r.name != name);
        self.roles.len() != before
    }

    /// Names of the roles currently marked active on this user, in order.
    pub fn active_role_names(&self) -> Vec<RoleName> {
        self.roles
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            roles: self.roles.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public projection of a user (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: String,
    pub roles: Vec<RoleSummary>,
    pub created_at: DateTime<Utc>,
}

/// Signup input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub name: String,
    pub password: String,
}

impl NewUser {
    /// Normalize (trim, lower-case email) and validate the signup input.
    pub fn validated(self) -> DomainResult<Self> {
        let email = self.email.trim().to_lowercase();
        let username = self.username.trim().to_string();
        let name = self.name.trim().to_string();

        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
        if !well_formed {
            return Err(DomainError::validation("email is not valid"));
        }
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("username must be a non-empty single word"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }

        Ok(Self {
            email,
            username,
            name,
            password: self.password,
        })
    }
}
