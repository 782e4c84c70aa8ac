//! Conversation turn types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in a conversation.
///
/// Fields are private so a turn cannot change after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn with an explicit timestamp.
    pub fn new(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at,
        }
    }

    /// A user turn stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Utc::now())
    }

    /// An assistant turn stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Utc::now())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Move the timestamp forward so it is strictly later than `previous`.
    pub(crate) fn ensure_after(&mut self, previous: DateTime<Utc>) {
        if self.created_at <= previous {
            self.created_at = previous + Duration::nanoseconds(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        let user = Turn::user("hi");
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.content(), "hi");

        let assistant = Turn::assistant("hello!");
        assert_eq!(assistant.role(), Role::Assistant);
        assert!(assistant.created_at() >= user.created_at());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn test_ensure_after() {
        let now = Utc::now();
        let mut turn = Turn::new(Role::User, "late clock", now - Duration::seconds(5));
        turn.ensure_after(now);
        assert_eq!(turn.created_at(), now + Duration::nanoseconds(1));

        let mut tied = Turn::new(Role::User, "same tick", now);
        tied.ensure_after(now);
        assert_eq!(tied.created_at(), now + Duration::nanoseconds(1));

        let mut fresh = Turn::new(Role::User, "fine", now + Duration::seconds(1));
        fresh.ensure_after(now);
        assert_eq!(fresh.created_at(), now + Duration::seconds(1));
    }
}
