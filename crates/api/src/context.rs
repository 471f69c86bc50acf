use aula_core::UserId;

/// Principal context for a request (authenticated identity).
///
/// Roles are not carried here: they are re-read from the user document
/// whenever a handler or the access control layer needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
