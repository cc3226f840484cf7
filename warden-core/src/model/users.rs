//! Locally managed user accounts.

use super::UserStatus;
use serde::{Deserialize, Serialize};

/// A user account.
///
/// User ids are unique across all sources, unlike role ids which are only
/// unique within their source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Globally unique user id
    pub id: String,
    /// Identity source that owns the account
    pub source: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account status
    #[serde(default)]
    pub status: UserStatus,
}

impl User {
    /// Create an active user of the given source
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            name: None,
            email: None,
            status: UserStatus::Active,
        }
    }

    /// Create an active user of the local source
    pub fn local(id: impl Into<String>) -> Self {
        Self::new(id, super::DEFAULT_SOURCE)
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the account may currently be used
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
