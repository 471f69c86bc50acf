use aula_auth::UserAccount;

use super::{Repository, RepositoryError};

impl Repository<UserAccount> {
    pub async fn by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let email = email.trim().to_lowercase();
        self.find(|u| u.email == email).await
    }

    pub async fn by_username(&self, username: &str) -> Result<Option<UserAccount>, RepositoryError> {
        self.find(|u| u.username == username).await
    }

    /// Publisher lookup: matches the display name or the username.
    pub async fn by_name_or_username(&self, who: &str) -> Result<Option<UserAccount>, RepositoryError> {
        self.find(|u| u.name == who || u.username == who).await
    }
}
