//! Role identities and role definitions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Composite identity of a role: the role id together with the source that
/// defines it.
///
/// Two keys are equal iff both fields are equal. Keys order by source first,
/// then by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleKey {
    /// Role id, unique within its source
    pub id: String,
    /// Identity source that owns the role
    pub source: String,
}

impl RoleKey {
    /// Create a new role key
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }

    /// Create a key for a role of the local source
    pub fn local(id: impl Into<String>) -> Self {
        Self::new(id, super::DEFAULT_SOURCE)
    }
}

impl Ord for RoleKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for RoleKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// A role groups privileges and other roles.
///
/// Holders of a role transitively gain every privilege of the roles it
/// contains. Contained roles and privileges are kept as ordered sets so the
/// persisted document keeps the order administrators entered them in.
///
/// # Builder Pattern
///
/// ```rust
/// use warden_core::model::{Role, RoleKey};
///
/// let role = Role::new(RoleKey::local("deployer"), "Deployer")
///     .with_description("Can deploy artifacts")
///     .with_privilege("artifact-create")
///     .with_role(RoleKey::local("reader"));
///
/// assert_eq!(role.privileges.len(), 1);
/// assert!(role.roles.contains(&RoleKey::local("reader")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Identity of the role
    pub key: RoleKey,
    /// Display name; filled from the id by validation when left empty
    #[serde(default)]
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// System-protected roles cannot be edited or deleted
    #[serde(default)]
    pub read_only: bool,
    /// Roles granted transitively by this role
    #[serde(default)]
    pub roles: IndexSet<RoleKey>,
    /// Privilege ids granted by this role
    #[serde(default)]
    pub privileges: IndexSet<String>,
}

impl Role {
    /// Create a new role with no contained roles or privileges
    pub fn new(key: RoleKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            description: None,
            read_only: false,
            roles: IndexSet::new(),
            privileges: IndexSet::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the role as system-protected
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Add a contained role
    pub fn with_role(mut self, key: RoleKey) -> Self {
        self.roles.insert(key);
        self
    }

    /// Add a privilege id
    pub fn with_privilege(mut self, privilege_id: impl Into<String>) -> Self {
        self.privileges.insert(privilege_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_key_ordering_is_source_first() {
        let mut keys = vec![
            RoleKey::new("b", "default"),
            RoleKey::new("a", "ldap"),
            RoleKey::new("a", "default"),
        ];
        keys.sort();

        assert_eq!(keys[0], RoleKey::new("a", "default"));
        assert_eq!(keys[1], RoleKey::new("b", "default"));
        assert_eq!(keys[2], RoleKey::new("a", "ldap"));
    }

    #[test]
    fn test_role_key_equality_needs_both_fields() {
        assert_eq!(RoleKey::local("admin"), RoleKey::new("admin", "default"));
        assert_ne!(RoleKey::local("admin"), RoleKey::new("admin", "ldap"));
        assert_eq!(RoleKey::new("admin", "ldap").to_string(), "ldap:admin");
    }

    #[test]
    fn test_role_sets_ignore_duplicates() {
        let role = Role::new(RoleKey::local("r"), "R")
            .with_privilege("p1")
            .with_privilege("p1")
            .with_role(RoleKey::local("x"))
            .with_role(RoleKey::local("x"));

        assert_eq!(role.privileges.len(), 1);
        assert_eq!(role.roles.len(), 1);
    }
}
