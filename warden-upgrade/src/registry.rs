//! Registry of upgrade steps by model version

use crate::upgraders::{DataUpgrader, Upgrader};
use indexmap::IndexMap;

/// Ordered mapping from model version to the structural [`Upgrader`] and the
/// optional [`DataUpgrader`] registered for it.
///
/// # Examples
///
/// ```rust
/// use warden_upgrade::{Upgrader, UpgraderRegistry};
///
/// let registry = UpgraderRegistry::standard();
/// assert_eq!(registry.upgrader("2.0.4"), Some(&Upgrader::From2_0_4));
/// assert!(registry.data_upgrader("2.3.0").is_some());
///
/// // A registry missing the 2.3.0 step
/// let partial = UpgraderRegistry::new().with_upgrader(Upgrader::From2_0_4);
/// assert!(partial.upgrader("2.3.0").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct UpgraderRegistry {
    upgraders: IndexMap<String, Upgrader>,
    data_upgraders: IndexMap<String, DataUpgrader>,
}

impl UpgraderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Every released upgrade step, oldest first
    pub fn standard() -> Self {
        Self::new()
            .with_upgrader(Upgrader::From2_0_4)
            .with_upgrader(Upgrader::From2_3_0)
            .with_data_upgrader(Upgrader::From2_3_0.from_version(), DataUpgrader::privilege_inheritance())
    }

    /// Register a structural step under the version it upgrades from
    pub fn with_upgrader(mut self, upgrader: Upgrader) -> Self {
        self.upgraders
            .insert(upgrader.from_version().to_string(), upgrader);
        self
    }

    /// Register a data step for a version
    pub fn with_data_upgrader(mut self, version: &str, upgrader: DataUpgrader) -> Self {
        self.data_upgraders.insert(version.to_string(), upgrader);
        self
    }

    /// Structural step for a version
    pub fn upgrader(&self, version: &str) -> Option<&Upgrader> {
        self.upgraders.get(version)
    }

    /// Data step for a version
    pub fn data_upgrader(&self, version: &str) -> Option<&DataUpgrader> {
        self.data_upgraders.get(version)
    }

    /// Versions with a structural step, in registration order
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.upgraders.keys().map(String::as_str)
    }
}
