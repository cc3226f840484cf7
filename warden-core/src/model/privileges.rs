//! Privilege definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the property holding the comma-joined action list of a `method`
/// privilege.
pub const METHOD_PROPERTY: &str = "method";

/// Type discriminator of action based privileges.
pub const METHOD_PRIVILEGE_TYPE: &str = "method";

/// Type discriminator of privileges that grant access to a repository target.
pub const TARGET_PRIVILEGE_TYPE: &str = "target";

/// A privilege is the unit of permission granted through roles.
///
/// The `privilege_type` selects the descriptor used to interpret
/// `properties`; for `method` privileges the `method` property holds the
/// permitted actions, e.g. `create,read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Privilege {
    /// Globally unique id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// System-protected privileges cannot be edited or deleted
    #[serde(default)]
    pub read_only: bool,
    /// Type discriminator
    #[serde(rename = "type")]
    pub privilege_type: String,
    /// Type specific properties, in insertion order
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl Privilege {
    /// Create a new privilege of the given type with no properties
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        privilege_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            read_only: false,
            privilege_type: privilege_type.into(),
            properties: IndexMap::new(),
        }
    }

    /// Create a `method` privilege granting the given comma-joined actions
    pub fn method(id: impl Into<String>, name: impl Into<String>, methods: &str) -> Self {
        Self::new(id, name, METHOD_PRIVILEGE_TYPE).with_property(METHOD_PROPERTY, methods)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a property, replacing any previous value for the key
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Mark the privilege as system-protected
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Look up a property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Actions of a `method` privilege, trimmed and without empty entries
    pub fn methods(&self) -> Vec<&str> {
        self.property(METHOD_PROPERTY)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
