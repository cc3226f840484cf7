//! # Warden Upgrade
//!
//! Versioned upgrade chain for persisted Warden configurations.
//!
//! A configuration document written by an older release is migrated forward
//! one model version at a time:
//!
//! | From    | To      | Structural change                                         |
//! |---------|---------|-----------------------------------------------------------|
//! | `2.0.4` | `2.3.0` | plain role ids become role keys of the `default` source   |
//! | `2.3.0` | `2.4.0` | property lists become maps, users gain a source           |
//!
//! After the `2.3.0` step the privilege inheritance data upgrade expands the
//! actions of every `method` privilege.
//!
//! ## Example
//!
//! ```rust
//! use warden_upgrade::{ConfigurationUpgrader, UpgraderRegistry};
//!
//! let legacy = br#"{
//!     "version": "2.0.4",
//!     "roles": [{"id": "admin", "name": "Admin", "roles": ["viewer"]},
//!               {"id": "viewer", "name": "Viewer"}]
//! }"#;
//!
//! let registry = UpgraderRegistry::standard();
//! let configuration = ConfigurationUpgrader::new(&registry).load_old_configuration(legacy)?;
//!
//! assert!(configuration.is_current());
//! assert_eq!(configuration.roles[0].key.source, "default");
//! # Ok::<(), warden_core::Error>(())
//! ```

pub mod chain;
pub mod legacy;
pub mod message;
pub mod registry;
pub mod upgraders;

pub use chain::ConfigurationUpgrader;
pub use message::{UpgradeMessage, VersionedConfiguration};
pub use registry::UpgraderRegistry;
pub use upgraders::{DataUpgrader, Upgrader};
