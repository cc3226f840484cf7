//! Model version 2.0.4: roles identified by a plain id.

use serde::{Deserialize, Serialize};
use warden_core::model::UserStatus;

/// Model version of this schema
pub const VERSION: &str = "2.0.4";

/// Version 2.0.4 configuration document
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

/// User without a source; every user was local
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
}

/// Role identified by its id alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub privileges: Vec<String>,
}

/// Privilege with its properties stored as a key/value list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Privilege {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(rename = "type")]
    pub privilege_type: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// One privilege property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// Role assignment referencing roles by plain id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleMapping {
    pub user_id: String,
    pub source: String,
    #[serde(default)]
    pub roles: Vec<String>,
}
