//! The persisted configuration document.

use super::*;
use serde::{Deserialize, Serialize};

/// Whole security configuration as persisted by a configuration source.
///
/// This is the document the upgrade chain produces and the store is built
/// from. The store owns the live copy; a `Configuration` is only a detached
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Model version of the document
    pub version: String,
    /// Local users
    #[serde(default)]
    pub users: Vec<User>,
    /// Role definitions
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Privilege definitions
    #[serde(default)]
    pub privileges: Vec<Privilege>,
    /// Role assignments per user and source
    #[serde(default)]
    pub user_role_mappings: Vec<UserRoleMapping>,
    /// External role bindings
    #[serde(default)]
    pub role_mappings: Vec<RoleMapping>,
}

impl Configuration {
    /// Create an empty configuration at the current model version
    pub fn new() -> Self {
        Self {
            version: MODEL_VERSION.to_string(),
            users: Vec::new(),
            roles: Vec::new(),
            privileges: Vec::new(),
            user_role_mappings: Vec::new(),
            role_mappings: Vec::new(),
        }
    }

    /// Whether the document is at the current model version
    pub fn is_current(&self) -> bool {
        self.version == MODEL_VERSION
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
