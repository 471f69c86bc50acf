use serde::{Deserialize, Serialize};

use aula_core::{DomainError, DomainResult, Entity, TagId};

/// A label owned by one user; `(name, username)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub username: String,
    pub is_active: bool,
}

impl Entity for Tag {
    type Id = TagId;
    const COLLECTION: &'static str = "tags";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Tag {
    pub fn create(input: NewTag) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        let username = input.username.trim().to_string();
        if name.is_empty() || username.is_empty() {
            return Err(DomainError::validation("tag name and username are required"));
        }
        Ok(Self {
            id: TagId::new(),
            name,
            username,
            is_active: true,
        })
    }

    pub fn is_same_label(&self, name: &str, username: &str) -> bool {
        self.name == name && self.username == username
    }

    pub fn apply(&mut self, update: TagUpdate) -> DomainResult<()> {
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("tag name must not be empty"));
            }
            self.name = name;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}
