//! Recognized privilege types

use crate::model::{METHOD_PRIVILEGE_TYPE, METHOD_PROPERTY, Privilege, TARGET_PRIVILEGE_TYPE};
use serde::{Deserialize, Serialize};

/// Describes one privilege type and the properties it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDescriptor {
    /// Type discriminator matched against `Privilege::privilege_type`
    pub type_id: String,
    /// Display name
    pub name: String,
    /// Properties that must be present and non-blank
    pub required_properties: Vec<String>,
}

impl PrivilegeDescriptor {
    /// Create a new descriptor
    pub fn new(type_id: &str, name: &str, required_properties: &[&str]) -> Self {
        Self {
            type_id: type_id.to_string(),
            name: name.to_string(),
            required_properties: required_properties.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Required properties missing or blank on the given privilege
    pub fn missing_properties<'a>(&'a self, privilege: &Privilege) -> Vec<&'a str> {
        self.required_properties
            .iter()
            .filter(|key| {
                privilege
                    .property(key)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(String::as_str)
            .collect()
    }
}

/// The set of privilege types the validator accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDescriptors {
    descriptors: Vec<PrivilegeDescriptor>,
}

impl PrivilegeDescriptors {
    /// An empty registry that accepts no privilege type
    pub fn empty() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Register a descriptor, replacing one with the same type id
    pub fn register(&mut self, descriptor: PrivilegeDescriptor) {
        self.descriptors
            .retain(|existing| existing.type_id != descriptor.type_id);
        self.descriptors.push(descriptor);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, descriptor: PrivilegeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Look up the descriptor of a type
    pub fn get(&self, type_id: &str) -> Option<&PrivilegeDescriptor> {
        self.descriptors.iter().find(|d| d.type_id == type_id)
    }

    /// All registered descriptors
    pub fn iter(&self) -> impl Iterator<Item = &PrivilegeDescriptor> {
        self.descriptors.iter()
    }
}

impl Default for PrivilegeDescriptors {
    fn default() -> Self {
        Self::empty()
            .with(PrivilegeDescriptor::new(
                METHOD_PRIVILEGE_TYPE,
                "Application Privilege",
                &[METHOD_PROPERTY],
            ))
            .with(PrivilegeDescriptor::new(
                TARGET_PRIVILEGE_TYPE,
                "Repository Target Privilege",
                &["repositoryTargetId"],
            ))
    }
}
