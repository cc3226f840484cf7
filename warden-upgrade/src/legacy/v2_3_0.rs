//! Model version 2.3.0: roles identified by id and source.
//!
//! Users and privileges are unchanged from 2.0.4.

use serde::{Deserialize, Serialize};
use warden_core::model::RoleKey;

pub use super::v2_0_4::{Privilege, Property, User};

/// Model version of this schema
pub const VERSION: &str = "2.3.0";

/// Version 2.3.0 configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub version: String,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
    #[serde(default)]
    pub user_role_mappings: Vec<UserRoleMapping>,
}

/// Role identified by a [`RoleKey`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub key: RoleKey,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub roles: Vec<RoleKey>,
    #[serde(default)]
    pub privileges: Vec<String>,
}

/// Role assignment referencing roles by key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleMapping {
    pub user_id: String,
    pub source: String,
    #[serde(default)]
    pub roles: Vec<RoleKey>,
}
