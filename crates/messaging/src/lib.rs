//! Messaging domain module: user-to-user messages and per-user tags.
//!
//! Deterministic domain logic only; persistence lives in `aula-infra`.

pub mod message;
pub mod tag;

pub use message::{Message, MessageQuery, MessageStatus, NewMessage, TagAction};
pub use tag::{NewTag, Tag, TagUpdate};
