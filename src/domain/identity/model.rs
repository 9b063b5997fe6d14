//! Chat participant identity

use serde::{Deserialize, Serialize};

/// Opaque chat identity (a Telegram chat / user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub i64);

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for IdentityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A chat participant, upserted on every interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    /// Handle without the leading `@`, if the participant has one
    pub username: Option<String>,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: impl Into<IdentityId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            display_name: display_name.into(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.username = (!username.is_empty()).then_some(username);
        self
    }
}
