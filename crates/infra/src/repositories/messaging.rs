use aula_messaging::{Message, MessageQuery, Tag};

use super::{Repository, RepositoryError};

impl Repository<Message> {
    /// Matching messages, newest first.
    pub async fn search(&self, query: &MessageQuery) -> Result<Vec<Message>, RepositoryError> {
        let mut messages = self.filter(|m| query.matches(m)).await?;
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(messages)
    }
}

impl Repository<Tag> {
    pub async fn by_label(&self, name: &str, username: &str) -> Result<Option<Tag>, RepositoryError> {
        self.find(|t| t.is_same_label(name, username)).await
    }

    pub async fn active_for(&self, username: &str) -> Result<Vec<Tag>, RepositoryError> {
        let mut tags = self.filter(|t| t.is_active && t.username == username).await?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}
