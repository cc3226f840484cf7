//! # Warden Core
//!
//! Model, indexed store and validator for role-based access-control
//! configurations.
//!
//! This crate provides the building blocks the rest of Warden is made of:
//!
//! - [`model`]: plain data records for users, roles, privileges and role
//!   mappings, plus the persisted [`model::Configuration`] document
//! - [`store`]: the [`store::ConfigStore`] that owns the RBAC graph and keeps
//!   an identity index per entity class
//! - [`validation`]: the [`validation::Validator`] that checks a candidate
//!   entity against a snapshot of the store before it is admitted
//!
//! ## Example
//!
//! ```rust
//! use warden_core::prelude::*;
//!
//! let mut store = ConfigStore::new();
//! let validator = Validator::new();
//!
//! let mut privilege = Privilege::method("1001", "Create artifacts", "create");
//! let context = ValidationContext::from_store(&store);
//! let response = validator.validate_privilege(&context, &mut privilege, false);
//! assert!(response.is_valid());
//!
//! validator.inheritance().apply(&mut privilege);
//! store.add_privilege(privilege)?;
//!
//! assert_eq!(
//!     store.privilege("1001").and_then(|p| p.property("method")),
//!     Some("create,read")
//! );
//! # Ok::<(), warden_core::Error>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod store;
pub mod utils;
pub mod validation;

pub use error::{Error, NotFoundError, Result};

/// Commonly used imports
pub mod prelude {
    pub use crate::error::{Error, NotFoundError, Result};
    pub use crate::model::*;
    pub use crate::store::ConfigStore;
    pub use crate::validation::{
        EmailPolicy, PrivilegeDescriptor, PrivilegeDescriptors, PrivilegeInheritance,
        ValidationContext, ValidationMessage, ValidationResponse, Validator,
    };
}
