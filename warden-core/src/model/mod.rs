//! Core RBAC model types
//!
//! Plain data records for the persisted security configuration: users,
//! roles, privileges and the two kinds of role mappings, plus the
//! `Configuration` document that carries them together with its model version.
//! These types carry no behaviour beyond construction helpers; all integrity
//! rules live in [`crate::validation`] and all indexing in [`crate::store`].

use serde::{Deserialize, Serialize};

pub mod configuration;
pub mod mappings;
pub mod privileges;
pub mod roles;
pub mod users;

pub use configuration::*;
pub use mappings::*;
pub use privileges::*;
pub use roles::*;
pub use users::*;

/// Model version of the configuration document this crate reads and writes.
pub const MODEL_VERSION: &str = "2.4.0";

/// Source name of the locally managed users and roles.
pub const DEFAULT_SOURCE: &str = "default";

/// Lifecycle status of a user account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Account may authenticate
    #[default]
    Active,
    /// Account was switched off by an administrator
    Disabled,
    /// Account was locked, e.g. after too many failed logins
    Locked,
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Disabled => write!(f, "disabled"),
            UserStatus::Locked => write!(f, "locked"),
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "disabled" => Ok(UserStatus::Disabled),
            "locked" => Ok(UserStatus::Locked),
            other => Err(crate::Error::invalid(
                "status",
                format!("Unknown user status '{}'", other),
            )),
        }
    }
}
