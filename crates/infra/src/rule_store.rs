//! Per-user rule lookup.
//!
//! Rules live on role documents; users only reference roles by name. A user's
//! rule set is rebuilt from the role documents on every call so that role
//! edits take effect without re-login.

use aula_auth::{Role, RoleName, RoleSummary, Rule, UserAccount};
use aula_core::UserId;
use thiserror::Error;

use crate::repositories::{Repository, RepositoryError};

#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("rule lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

#[async_trait::async_trait]
pub trait RuleSource: Send + Sync {
    /// Role summaries stored on the user, in assignment order.
    async fn user_roles(&self, user_id: UserId) -> Result<Vec<RoleSummary>, RuleStoreError>;

    /// Rules of a role. Missing or inactive roles yield no rules.
    async fn rules_for_role(&self, name: &RoleName) -> Result<Vec<Rule>, RuleStoreError>;

    /// Concatenation of the rules of the user's active roles, in role order.
    async fn rules_for_user(&self, user_id: UserId) -> Result<Vec<Rule>, RuleStoreError> {
        let mut rules = Vec::new();
        for role in self.user_roles(user_id).await? {
            if !role.is_active {
                continue;
            }
            rules.extend(self.rules_for_role(&role.name).await?);
        }
        Ok(rules)
    }
}

/// [`RuleSource`] over the user and role repositories.
#[derive(Clone)]
pub struct DocumentRuleSource {
    users: Repository<UserAccount>,
    roles: Repository<Role>,
}

impl DocumentRuleSource {
    pub fn new(users: Repository<UserAccount>, roles: Repository<Role>) -> Self {
        Self { users, roles }
    }
}

#[async_trait::async_trait]
impl RuleSource for DocumentRuleSource {
    async fn user_roles(&self, user_id: UserId) -> Result<Vec<RoleSummary>, RuleStoreError> {
        let user = self
            .users
            .get(&user_id)
            .await?
            .ok_or(RuleStoreError::UnknownUser(user_id))?;
        Ok(user.roles)
    }

    async fn rules_for_role(&self, name: &RoleName) -> Result<Vec<Rule>, RuleStoreError> {
        match self.roles.by_name(name).await? {
            Some(role) if role.is_active => Ok(role.rules),
            Some(_) => {
                tracing::debug!(role = %name, "inactive role contributes no rules");
                Ok(Vec::new())
            }
            None => {
                tracing::warn!(role = %name, "user references a role that does not exist");
                Ok(Vec::new())
            }
        }
    }
}
