//! Drives a legacy document through the registered upgrade steps

use crate::message::{UpgradeMessage, VersionedConfiguration};
use crate::registry::UpgraderRegistry;
use tracing::{info, warn};
use warden_core::model::{Configuration, MODEL_VERSION};
use warden_core::utils::json;
use warden_core::{Error, Result};

/// Migrates a persisted configuration of an older model version to the
/// current one.
///
/// The chain is only consulted after a document failed to load as the current
/// model. It either returns a document at [`MODEL_VERSION`] or fails; it never
/// hands back an intermediate version.
#[derive(Debug, Clone, Copy)]
pub struct ConfigurationUpgrader<'a> {
    registry: &'a UpgraderRegistry,
}

impl<'a> ConfigurationUpgrader<'a> {
    /// Create an upgrader over the given registry
    pub fn new(registry: &'a UpgraderRegistry) -> Self {
        Self { registry }
    }

    /// Load and upgrade a raw document.
    ///
    /// # Errors
    ///
    /// * [`Error::ConfigurationCorrupted`] if the version cannot be read, if
    ///   the document claims the current version, or if a step cannot parse it
    /// * [`Error::UnsupportedSchemaVersion`] naming the document's own version
    ///   if any step of the path is not registered
    pub fn load_old_configuration(&self, bytes: &[u8]) -> Result<Configuration> {
        let version = sniff_version(bytes)?;

        if version == MODEL_VERSION {
            return Err(Error::corrupted(format!(
                "Configuration declares the current version {} but could not be loaded",
                version
            )));
        }

        let upgrader = self.registry.upgrader(&version).ok_or_else(|| {
            warn!(version = %version, known = ?self.known_versions(), "No upgrader for configuration version");
            Error::unsupported_version(&version)
        })?;

        info!(version = %version, target = MODEL_VERSION, "Upgrading configuration");
        let mut message = upgrader.load_configuration(bytes)?;

        while message.model_version != MODEL_VERSION {
            message = self.step(message, &version)?;
        }

        match message.configuration {
            VersionedConfiguration::Current(configuration) => {
                info!(from = %version, to = MODEL_VERSION, "Configuration upgraded");
                Ok(configuration)
            }
            other => Err(Error::corrupted(format!(
                "Upgrade chain ended with a {} document",
                other.schema()
            ))),
        }
    }

    fn known_versions(&self) -> Vec<&str> {
        self.registry.versions().collect()
    }

    fn step(&self, message: UpgradeMessage, original_version: &str) -> Result<UpgradeMessage> {
        let current = message.model_version.clone();

        let upgrader = self.registry.upgrader(&current).ok_or_else(|| {
            warn!(
                version = %current,
                original = %original_version,
                known = ?self.known_versions(),
                "Upgrade chain is missing a step"
            );
            Error::unsupported_version(original_version)
        })?;

        let mut message = upgrader.upgrade(message)?;

        if let Some(data_upgrader) = self.registry.data_upgrader(&current) {
            data_upgrader.upgrade(&mut message)?;
        }

        Ok(message)
    }
}

fn sniff_version(bytes: &[u8]) -> Result<String> {
    match json::read_string_field(bytes, "version") {
        Ok(Some(version)) => Ok(version),
        Ok(None) => Err(Error::corrupted("Configuration has no version")),
        Err(e) => Err(Error::corrupted(format!(
            "Configuration version could not be read: {}",
            e
        ))),
    }
}
