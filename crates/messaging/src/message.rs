use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aula_core::{DomainError, DomainResult, Entity, MessageId};

/// Message document. `from`/`to` are user emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub inquiry: bool,
    #[serde(default)]
    pub complaint: bool,
    #[serde(default)]
    pub highlighted: bool,
    pub active: bool,
    pub sent_at: DateTime<Utc>,
}

impl Entity for Message {
    type Id = MessageId;
    const COLLECTION: &'static str = "messages";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Status flag a message can be moved to, also usable as a listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Read,
    Unread,
    Inquiry,
    Complaint,
    Archived,
    Unarchived,
    Deactivated,
    Activated,
    Highlighted,
}

impl core::str::FromStr for MessageStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "unread" => Ok(Self::Unread),
            "inquiry" => Ok(Self::Inquiry),
            "complaint" => Ok(Self::Complaint),
            "archived" => Ok(Self::Archived),
            "unarchived" => Ok(Self::Unarchived),
            "deactivated" => Ok(Self::Deactivated),
            "activated" => Ok(Self::Activated),
            "highlighted" => Ok(Self::Highlighted),
            other => Err(DomainError::validation(format!("unknown message status '{other}'"))),
        }
    }
}

/// Add or remove tag names on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    Add,
    Eliminate,
}

impl Message {
    pub fn send(input: NewMessage, sent_at: DateTime<Utc>) -> DomainResult<Self> {
        let input = input.validated()?;
        Ok(Self {
            id: MessageId::new(),
            from: input.from,
            to: input.to,
            subject: input.subject,
            body: input.body,
            tags: Vec::new(),
            read: false,
            archived: false,
            inquiry: false,
            complaint: false,
            highlighted: false,
            active: true,
            sent_at,
        })
    }

    pub fn apply_status(&mut self, status: MessageStatus) {
        match status {
            MessageStatus::Read => self.read = true,
            MessageStatus::Unread => self.read = false,
            MessageStatus::Inquiry => {
                self.inquiry = true;
                self.complaint = false;
            }
            MessageStatus::Complaint => {
                self.complaint = true;
                self.inquiry = false;
            }
            MessageStatus::Archived => self.archived = true,
            MessageStatus::Unarchived => self.archived = false,
            MessageStatus::Deactivated => self.active = false,
            MessageStatus::Activated => self.active = true,
            MessageStatus::Highlighted => self.highlighted = !self.highlighted,
        }
    }

    pub fn has_status(&self, status: MessageStatus) -> bool {
        match status {
            MessageStatus::Read => self.read,
            MessageStatus::Unread => !self.read,
            MessageStatus::Inquiry => self.inquiry,
            MessageStatus::Complaint => self.complaint,
            MessageStatus::Archived => self.archived,
            MessageStatus::Unarchived => !self.archived,
            MessageStatus::Deactivated => !self.active,
            MessageStatus::Activated => self.active,
            MessageStatus::Highlighted => self.highlighted,
        }
    }

    /// Returns whether the tag list changed.
    pub fn apply_tags(&mut self, action: TagAction, names: &[String]) -> bool {
        let before = self.tags.clone();
        match action {
            TagAction::Add => {
                for name in names {
                    if !self.tags.contains(name) {
                        self.tags.push(name.clone());
                    }
                }
            }
            TagAction::Eliminate => self.tags.retain(|t| !names.contains(t)),
        }
        self.tags != before
    }

    pub fn involves(&self, email: &str) -> bool {
        self.from.eq_ignore_ascii_case(email) || self.to.eq_ignore_ascii_case(email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl NewMessage {
    pub fn validated(mut self) -> DomainResult<Self> {
        self.from = self.from.trim().to_lowercase();
        self.to = self.to.trim().to_lowercase();
        self.subject = self.subject.trim().to_string();
        if self.from.is_empty() || self.to.is_empty() {
            return Err(DomainError::validation("sender and recipient are required"));
        }
        if self.subject.is_empty() {
            return Err(DomainError::validation("subject must not be empty"));
        }
        Ok(self)
    }
}

/// Listing query for a user's mailbox.
///
/// Only one criterion applies, in order: status filter, keywords, tags.
/// With none of them every message of the user is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub email: String,
    pub filter: Option<MessageStatus>,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
}

impl MessageQuery {
    pub fn matches(&self, message: &Message) -> bool {
        if !message.involves(&self.email) {
            return false;
        }
        if let Some(status) = self.filter {
            return message.has_status(status);
        }
        if !self.keywords.is_empty() {
            let subject = message.subject.to_lowercase();
            let body = message.body.to_lowercase();
            return self.keywords.iter().any(|k| {
                let k = k.to_lowercase();
                subject.contains(&k) || body.contains(&k)
            });
        }
        if !self.tags.is_empty() {
            return self.tags.iter().any(|t| message.tags.contains(t));
        }
        true
    }
}
