//! Authorization manager for Warden RBAC configurations
//!
//! This crate is the public facade over the Warden core: it owns the cached
//! configuration store, runs the validator before every mutation, writes the
//! configuration back through a [`ConfigurationSource`](source::ConfigurationSource)
//! and notifies listeners of every change.
//!
//! # Features
//!
//! - **Validated CRUD**: users, roles, privileges, user role mappings and
//!   external role mappings
//! - **Cascading deletes**: references to deleted roles and privileges are
//!   removed from the rest of the model
//! - **Lazy loading**: the configuration is read (and upgraded if it was
//!   written by an older release) on first access and after a cache clear
//! - **Queries**: role trees, effective privileges, external role
//!   resolution and user search
//!
//! # Quick Start
//!
//! ```rust
//! use warden_authz::prelude::*;
//! use warden_core::model::*;
//!
//! let manager = AuthorizationManager::builder()
//!     .with_settings(WardenSettings::development())
//!     .with_source(MemoryConfigurationSource::new())
//!     .build()?;
//!
//! manager.create_privilege(Privilege::method("read", "Read", "read"))?;
//! manager.create_role(Role::new(RoleKey::local("viewer"), "Viewer").with_privilege("read"))?;
//! manager.create_role_mapping(RoleMapping::new("ldap", "Developers", [RoleKey::local("viewer")]))?;
//!
//! let roles = manager.resolve_external_roles("ldap", &["developers"])?;
//! assert!(manager.privileges_for_roles(roles)?.contains("read"));
//! # Ok::<(), warden_core::Error>(())
//! ```

pub mod cache;
pub mod config;
pub mod events;
pub mod manager;
pub mod queries;
pub mod security;
pub mod source;

pub mod prelude {
    //! Common imports for Warden authorization

    pub use crate::cache::ConfigCache;
    pub use crate::config::WardenSettings;
    pub use crate::events::{AuthorizationEvent, ChangeKind, EntityKind, EventBus};
    pub use crate::manager::{AuthorizationManager, AuthorizationManagerBuilder, MutationState};
    pub use crate::queries::{RoleTreeNode, UserSearchCriteria};
    pub use crate::security::{SecurityPrivilege, SecurityRole, SecurityUser};
    pub use crate::source::{
        ConfigurationSource, FileConfigurationSource, MemoryConfigurationSource,
    };
    pub use warden_core::{Error, Result};
}

pub use manager::AuthorizationManager;
