//! User role mappings and external role mappings.

use super::RoleKey;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Assigns roles to a user of a given source.
///
/// Mappings are identified by the lowercased user id and the source, so
/// `Foo` and `foo` of the same source share one mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleMapping {
    /// User id as entered
    pub user_id: String,
    /// Source of the user
    pub source: String,
    /// Roles assigned to the user
    #[serde(default)]
    pub roles: IndexSet<RoleKey>,
}

impl UserRoleMapping {
    /// Create a new mapping
    pub fn new(
        user_id: impl Into<String>,
        source: impl Into<String>,
        roles: impl IntoIterator<Item = RoleKey>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            source: source.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Index key of this mapping
    pub fn key(&self) -> MappingKey {
        MappingKey::new(&self.user_id, &self.source)
    }
}

/// Binds an external role (e.g. an LDAP group) to internal roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMapping {
    /// Source of the external role
    pub source: String,
    /// External role id as entered
    pub role_id: String,
    /// Internal roles granted to holders of the external role
    #[serde(default)]
    pub roles: IndexSet<RoleKey>,
}

impl RoleMapping {
    /// Create a new external role mapping
    pub fn new(
        source: impl Into<String>,
        role_id: impl Into<String>,
        roles: impl IntoIterator<Item = RoleKey>,
    ) -> Self {
        Self {
            source: source.into(),
            role_id: role_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Index key of this mapping
    pub fn key(&self) -> MappingKey {
        MappingKey::new(&self.role_id, &self.source)
    }
}

/// Case-insensitive index key shared by both mapping kinds: the lowercased
/// principal (user id or external role id) plus the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingKey {
    principal: String,
    source: String,
}

impl MappingKey {
    /// Build the key for a principal and source
    pub fn new(principal: &str, source: &str) -> Self {
        Self {
            principal: principal.to_lowercase(),
            source: source.to_string(),
        }
    }

    /// Lowercased principal
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Source
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for MappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.principal, self.source)
    }
}
