//! The in-flight carrier threaded through the upgrade chain

use crate::legacy::{v2_0_4, v2_3_0};
use warden_core::model::Configuration;

/// A configuration document under one of the schemas the chain understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedConfiguration {
    /// Model version 2.0.4
    V2_0_4(v2_0_4::Configuration),
    /// Model version 2.3.0
    V2_3_0(v2_3_0::Configuration),
    /// The current model version
    Current(Configuration),
}

impl VersionedConfiguration {
    /// Schema name used in log and error messages
    pub fn schema(&self) -> &'static str {
        match self {
            VersionedConfiguration::V2_0_4(_) => v2_0_4::VERSION,
            VersionedConfiguration::V2_3_0(_) => v2_3_0::VERSION,
            VersionedConfiguration::Current(_) => warden_core::model::MODEL_VERSION,
        }
    }
}

/// A configuration on its way to the current model version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeMessage {
    /// The document, under the schema of `model_version`
    pub configuration: VersionedConfiguration,
    /// Model version the document is currently at
    pub model_version: String,
}

impl UpgradeMessage {
    /// Create a new message
    pub fn new(configuration: VersionedConfiguration, model_version: impl Into<String>) -> Self {
        Self {
            configuration,
            model_version: model_version.into(),
        }
    }
}
