//! External security model representation
//!
//! Consumers of the authorization manager (REST resources, realms) work with
//! these flattened records instead of the persisted model. Conversions are
//! lossless except for ordering: sets are sorted here and keep their sorted
//! order when converted back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use warden_core::model::{Privilege, Role, RoleKey, User, UserStatus};

/// Role as seen by security consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRole {
    pub role_id: String,
    pub source: String,
    pub name: String,
    pub description: Option<String>,
    pub read_only: bool,
    pub roles: BTreeSet<RoleKey>,
    pub privileges: BTreeSet<String>,
}

impl SecurityRole {
    /// Key of the role
    pub fn key(&self) -> RoleKey {
        RoleKey::new(&self.role_id, &self.source)
    }
}

impl From<Role> for SecurityRole {
    fn from(role: Role) -> Self {
        Self {
            role_id: role.key.id,
            source: role.key.source,
            name: role.name,
            description: role.description,
            read_only: role.read_only,
            roles: role.roles.into_iter().collect(),
            privileges: role.privileges.into_iter().collect(),
        }
    }
}

impl From<SecurityRole> for Role {
    fn from(role: SecurityRole) -> Self {
        Self {
            key: RoleKey::new(role.role_id, role.source),
            name: role.name,
            description: role.description,
            read_only: role.read_only,
            roles: role.roles.into_iter().collect(),
            privileges: role.privileges.into_iter().collect(),
        }
    }
}

/// Privilege as seen by security consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPrivilege {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub read_only: bool,
    #[serde(rename = "type")]
    pub privilege_type: String,
    pub properties: BTreeMap<String, String>,
}

impl From<Privilege> for SecurityPrivilege {
    fn from(privilege: Privilege) -> Self {
        Self {
            id: privilege.id,
            name: privilege.name,
            description: privilege.description,
            read_only: privilege.read_only,
            privilege_type: privilege.privilege_type,
            properties: privilege.properties.into_iter().collect(),
        }
    }
}

impl From<SecurityPrivilege> for Privilege {
    fn from(privilege: SecurityPrivilege) -> Self {
        Self {
            id: privilege.id,
            name: privilege.name,
            description: privilege.description,
            read_only: privilege.read_only,
            privilege_type: privilege.privilege_type,
            properties: privilege.properties.into_iter().collect(),
        }
    }
}

/// User with the roles assigned to it in its own source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityUser {
    pub user_id: String,
    pub source: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: UserStatus,
    pub roles: BTreeSet<RoleKey>,
}

impl SecurityUser {
    /// Combine a user with its assigned roles
    pub fn new(user: User, roles: impl IntoIterator<Item = RoleKey>) -> Self {
        Self {
            user_id: user.id,
            source: user.source,
            name: user.name,
            email: user.email,
            status: user.status,
            roles: roles.into_iter().collect(),
        }
    }

    /// Split into the user record and its roles
    pub fn into_parts(self) -> (User, BTreeSet<RoleKey>) {
        let user = User {
            id: self.user_id,
            source: self.source,
            name: self.name,
            email: self.email,
            status: self.status,
        };
        (user, self.roles)
    }
}
