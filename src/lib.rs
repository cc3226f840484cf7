//! # Warden - validated, versioned RBAC configuration
//!
//! This crate re-exports the functionality of the constituent crates:
//! - `warden-core`: model, indexed store and validator
//! - `warden-upgrade`: upgrade chain for configurations written by older releases
//! - `warden-authz`: authorization manager facade, persistence and queries

pub use warden_authz as authz;
pub use warden_core as core;
pub use warden_upgrade as upgrade;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::authz::prelude::*;
    pub use crate::core::prelude::*;
    pub use crate::upgrade::{ConfigurationUpgrader, DataUpgrader, Upgrader, UpgraderRegistry};
}
