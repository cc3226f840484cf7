//! Version-to-version transformers
//!
//! An [`Upgrader`] performs one structural schema change and advances the
//! message's model version. A [`DataUpgrader`] migrates content without
//! changing the schema and runs right after the structural step registered
//! under the same version.

use crate::legacy::{v2_0_4, v2_3_0};
use crate::message::{UpgradeMessage, VersionedConfiguration};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};
use warden_core::model::{
    self, Configuration, DEFAULT_SOURCE, MODEL_VERSION, RoleKey, UserRoleMapping,
};
use warden_core::utils::json;
use warden_core::validation::PrivilegeInheritance;
use warden_core::{Error, Result};

/// One structural upgrade step, named after the version it upgrades from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upgrader {
    /// Plain role ids become role keys of the local source
    From2_0_4,
    /// Property lists become ordered maps; users gain a source; role mappings
    /// are introduced
    From2_3_0,
}

impl Upgrader {
    /// Model version this step upgrades from
    pub fn from_version(&self) -> &'static str {
        match self {
            Upgrader::From2_0_4 => v2_0_4::VERSION,
            Upgrader::From2_3_0 => v2_3_0::VERSION,
        }
    }

    /// Model version this step produces
    pub fn to_version(&self) -> &'static str {
        match self {
            Upgrader::From2_0_4 => v2_3_0::VERSION,
            Upgrader::From2_3_0 => MODEL_VERSION,
        }
    }

    /// Parse a raw document under this step's own schema.
    pub fn load_configuration(&self, bytes: &[u8]) -> Result<UpgradeMessage> {
        let configuration = match self {
            Upgrader::From2_0_4 => {
                VersionedConfiguration::V2_0_4(json::from_slice(bytes).map_err(|e| {
                    Error::corrupted(format!("Unreadable {} document: {}", v2_0_4::VERSION, e))
                })?)
            }
            Upgrader::From2_3_0 => {
                VersionedConfiguration::V2_3_0(json::from_slice(bytes).map_err(|e| {
                    Error::corrupted(format!("Unreadable {} document: {}", v2_3_0::VERSION, e))
                })?)
            }
        };

        Ok(UpgradeMessage::new(configuration, self.from_version()))
    }

    /// Transform the message's document and advance its version.
    pub fn upgrade(&self, message: UpgradeMessage) -> Result<UpgradeMessage> {
        let configuration = match (self, message.configuration) {
            (Upgrader::From2_0_4, VersionedConfiguration::V2_0_4(old)) => {
                VersionedConfiguration::V2_3_0(upgrade_2_0_4(old))
            }
            (Upgrader::From2_3_0, VersionedConfiguration::V2_3_0(old)) => {
                VersionedConfiguration::Current(upgrade_2_3_0(old))
            }
            (_, other) => {
                return Err(Error::corrupted(format!(
                    "Upgrader for {} cannot read a {} document",
                    self.from_version(),
                    other.schema()
                )));
            }
        };

        debug!(
            from = self.from_version(),
            to = self.to_version(),
            "Applied configuration upgrade step"
        );
        Ok(UpgradeMessage::new(configuration, self.to_version()))
    }
}

fn local_key(role_id: String) -> RoleKey {
    RoleKey::new(role_id, DEFAULT_SOURCE)
}

fn upgrade_2_0_4(old: v2_0_4::Configuration) -> v2_3_0::Configuration {
    let roles = old
        .roles
        .into_iter()
        .map(|role| v2_3_0::Role {
            key: local_key(role.id),
            name: role.name,
            description: role.description,
            read_only: role.read_only,
            roles: role.roles.into_iter().map(local_key).collect(),
            privileges: role.privileges,
        })
        .collect();

    let user_role_mappings = old
        .user_role_mappings
        .into_iter()
        .map(|mapping| v2_3_0::UserRoleMapping {
            user_id: mapping.user_id,
            source: mapping.source,
            roles: mapping.roles.into_iter().map(local_key).collect(),
        })
        .collect();

    v2_3_0::Configuration {
        version: v2_3_0::VERSION.to_string(),
        users: old.users,
        roles,
        privileges: old.privileges,
        user_role_mappings,
    }
}

fn upgrade_2_3_0(old: v2_3_0::Configuration) -> Configuration {
    let users = old
        .users
        .into_iter()
        .map(|user| model::User {
            id: user.id,
            source: DEFAULT_SOURCE.to_string(),
            name: user.name,
            email: user.email,
            status: user.status,
        })
        .collect();

    let roles = old
        .roles
        .into_iter()
        .map(|role| model::Role {
            key: role.key,
            name: role.name,
            description: role.description,
            read_only: role.read_only,
            roles: role.roles.into_iter().collect(),
            privileges: role.privileges.into_iter().collect(),
        })
        .collect();

    let privileges = old
        .privileges
        .into_iter()
        .map(|privilege| {
            let mut properties = IndexMap::new();
            for property in privilege.properties {
                if properties.contains_key(&property.key) {
                    warn!(privilege = %privilege.id, key = %property.key, "Duplicate privilege property, keeping the last value");
                }
                properties.insert(property.key, property.value);
            }
            model::Privilege {
                id: privilege.id,
                name: privilege.name,
                description: privilege.description,
                read_only: privilege.read_only,
                privilege_type: privilege.privilege_type,
                properties,
            }
        })
        .collect();

    let user_role_mappings = old
        .user_role_mappings
        .into_iter()
        .map(|mapping| {
            UserRoleMapping::new(
                mapping.user_id,
                mapping.source,
                mapping.roles.into_iter().collect::<IndexSet<_>>(),
            )
        })
        .collect();

    Configuration {
        version: MODEL_VERSION.to_string(),
        users,
        roles,
        privileges,
        user_role_mappings,
        role_mappings: Vec::new(),
    }
}

/// Content migration applied after a structural step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataUpgrader {
    /// Expand the actions of every `method` privilege with the actions they
    /// imply
    PrivilegeInheritance(PrivilegeInheritance),
}

impl DataUpgrader {
    /// Privilege inheritance with the default rules
    pub fn privilege_inheritance() -> Self {
        DataUpgrader::PrivilegeInheritance(PrivilegeInheritance::default())
    }

    /// Migrate the message's document in place.
    pub fn upgrade(&self, message: &mut UpgradeMessage) -> Result<()> {
        match (self, &mut message.configuration) {
            (DataUpgrader::PrivilegeInheritance(inheritance), VersionedConfiguration::Current(configuration)) => {
                let mut rewritten = 0;
                for privilege in &mut configuration.privileges {
                    if inheritance.apply(privilege) {
                        rewritten += 1;
                    }
                }
                debug!(rewritten = rewritten, "Applied privilege inheritance to configuration");
                Ok(())
            }
            (_, other) => Err(Error::corrupted(format!(
                "Privilege inheritance cannot migrate a {} document",
                other.schema()
            ))),
        }
    }
}
