//! Settings for the Warden authorization manager

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use warden_core::model::DEFAULT_SOURCE;
use warden_core::validation::{EmailPolicy, PrivilegeDescriptor, PrivilegeDescriptors, Validator};
use warden_core::{Error, Result};

/// Authorization manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenSettings {
    /// Path of the persisted configuration document
    pub configuration_file: PathBuf,
    /// Source of locally managed users
    pub default_source: String,
    /// How duplicate user emails are treated
    pub email_policy: EmailPolicy,
    /// Remove references to deleted entities
    pub cascade_on_delete: bool,
    /// Recognized privilege types
    pub privilege_types: Vec<PrivilegeDescriptor>,
    /// Write the configuration back after each mutation
    pub persistence_enabled: bool,
    /// Capacity of the change notification channel
    pub event_capacity: usize,
}

impl Default for WardenSettings {
    fn default() -> Self {
        Self {
            configuration_file: PathBuf::from("security.json"),
            default_source: DEFAULT_SOURCE.to_string(),
            email_policy: EmailPolicy::Unique,
            cascade_on_delete: true,
            privilege_types: PrivilegeDescriptors::default().iter().cloned().collect(),
            persistence_enabled: true,
            event_capacity: 64,
        }
    }
}

impl WardenSettings {
    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::configuration(format!("Failed to read settings file: {}", e))
        })?;

        let settings: WardenSettings = serde_json::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::configuration(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path.as_ref(), content).map_err(|e| {
            Error::configuration(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Settings for development: nothing is written to disk and duplicate
    /// emails only warn
    pub fn development() -> Self {
        Self {
            email_policy: EmailPolicy::Warn,
            persistence_enabled: false,
            ..Self::default()
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.default_source.trim().is_empty() {
            return Err(Error::configuration("Default source must not be empty"));
        }

        if self.persistence_enabled && self.configuration_file.as_os_str().is_empty() {
            return Err(Error::configuration(
                "A configuration file is required when persistence is enabled",
            ));
        }

        if self.event_capacity == 0 {
            return Err(Error::configuration("Event capacity must be at least 1"));
        }

        let mut type_ids = HashSet::new();
        for descriptor in &self.privilege_types {
            if descriptor.type_id.trim().is_empty() {
                return Err(Error::configuration("Privilege type id must not be empty"));
            }
            if !type_ids.insert(&descriptor.type_id) {
                return Err(Error::configuration(format!(
                    "Duplicate privilege type: {}",
                    descriptor.type_id
                )));
            }
        }

        Ok(())
    }

    /// Privilege descriptor registry built from `privilege_types`
    pub fn descriptors(&self) -> PrivilegeDescriptors {
        self.privilege_types
            .iter()
            .cloned()
            .fold(PrivilegeDescriptors::empty(), PrivilegeDescriptors::with)
    }

    /// Validator configured from these settings
    pub fn validator(&self) -> Validator {
        Validator::new()
            .with_descriptors(self.descriptors())
            .with_email_policy(self.email_policy)
            .with_local_source(self.default_source.clone())
    }
}
