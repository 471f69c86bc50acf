use aula_auth::{Role, RoleName};

use super::{Repository, RepositoryError};

impl Repository<Role> {
    pub async fn by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError> {
        self.find(|r| &r.name == name).await
    }

    /// Roles ordered by name.
    pub async fn sorted(&self) -> Result<Vec<Role>, RepositoryError> {
        let mut roles = self.all().await?;
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    /// The role handed to new accounts: first active default role by name.
    pub async fn default_role(&self) -> Result<Option<Role>, RepositoryError> {
        Ok(self
            .sorted()
            .await?
            .into_iter()
            .find(|r| r.is_default && r.is_active))
    }
}
