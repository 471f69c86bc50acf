use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use aula_core::{DomainError, DomainResult, Entity, RoleId};

use crate::rule::Rule;

/// Role name, the key users and rule lookups refer to a role by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub const ADMIN: &'static str = "admin";
    pub const PUBLISHER: &'static str = "publisher";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse user input: trimmed, lower-cased, non-empty.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim().to_lowercase();
        if name.is_empty() {
            return Err(DomainError::validation("role name must not be empty"));
        }
        if name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("role name must be a single path-safe word"));
        }
        Ok(Self(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role document: flags plus the data-shape rules it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_true() -> bool {
    true
}

impl Entity for Role {
    type Id = RoleId;
    const COLLECTION: &'static str = "roles";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Role {
    pub fn new(name: RoleName, description: impl Into<String>) -> Self {
        Self {
            id: RoleId::new(),
            name,
            description: description.into(),
            is_default: false,
            is_active: true,
            rules: Vec::new(),
        }
    }

    /// The copy embedded on user documents.
    pub fn summary(&self) -> RoleSummary {
        RoleSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            is_default: self.is_default,
            is_active: self.is_active,
        }
    }

    pub fn apply(&mut self, update: RoleUpdate) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(is_default) = update.is_default {
            self.is_default = is_default;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(rules) = update.rules {
            self.rules = rules;
        }
    }
}

/// Role reference stored on a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    pub name: RoleName,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial role update; `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    pub description: Option<String>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
    pub rules: Option<Vec<Rule>>,
}
