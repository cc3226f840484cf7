//! Error types for Warden.
//!
//! This module defines the error taxonomy shared by every Warden crate. The
//! main `Error` enum separates failures the caller is expected to act on
//! (validation, not found) from failures that signal damage or an operational
//! problem (corrupted or unsupported configurations, persistence failures).
//!
//! # Examples
//!
//! ```rust
//! use warden_core::error::{Error, NotFoundError, Result};
//!
//! fn lookup() -> Result<()> {
//!     Err(Error::NotFound(NotFoundError::User("jdoe".to_string())))
//! }
//!
//! assert!(lookup().unwrap_err().is_not_found());
//! ```

use crate::model::RoleKey;
use crate::validation::ValidationResponse;
use thiserror::Error;

/// Result type alias for Warden operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Warden operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A proposed entity failed structural or referential validation.
    ///
    /// The full response is carried so callers can report every problem at once.
    #[error("Invalid configuration: {0}")]
    Validation(ValidationResponse),

    /// The requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// The persisted document could not be parsed or sniffed, or it claims the
    /// current model version but still failed to load.
    #[error("Configuration is corrupted: {0}")]
    ConfigurationCorrupted(String),

    /// No upgrade path is registered for the given model version.
    #[error("Unsupported configuration version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Input/output error from the persistence backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The in-memory change was committed but could not be written back.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid settings (missing files, bad values, etc.).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Entity lookups that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    /// No user with the given id.
    #[error("user '{0}'")]
    User(String),

    /// No role with the given key.
    #[error("role '{0}'")]
    Role(RoleKey),

    /// No privilege with the given id.
    #[error("privilege '{0}'")]
    Privilege(String),

    /// No user role mapping for the given user and source.
    #[error("user role mapping for user '{user_id}' in source '{source_id}'")]
    UserRoleMapping {
        /// User id as requested
        user_id: String,
        /// Source of the mapping
        source_id: String,
    },

    /// No external role mapping for the given source and role id.
    #[error("role mapping for role '{role_id}' in source '{source_id}'")]
    RoleMapping {
        /// Source of the external role
        source_id: String,
        /// External role id as requested
        role_id: String,
    },
}

impl Error {
    /// Create a new validation error from a response.
    pub fn validation(response: ValidationResponse) -> Self {
        Self::Validation(response)
    }

    /// Create a validation error carrying a single message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use warden_core::error::Error;
    ///
    /// let error = Error::invalid("*", "Role 'admin' is read only");
    /// assert!(error.is_client_error());
    /// ```
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut response = ValidationResponse::new();
        response.add_error(key, message);
        Self::Validation(response)
    }

    /// Create a new corruption error.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::ConfigurationCorrupted(msg.into())
    }

    /// Create a new unsupported version error.
    pub fn unsupported_version(version: impl Into<String>) -> Self {
        Self::UnsupportedSchemaVersion(version.into())
    }

    /// Create a new persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The validation response, if this is a validation failure.
    pub fn validation_response(&self) -> Option<&ValidationResponse> {
        match self {
            Self::Validation(response) => Some(response),
            _ => None,
        }
    }

    /// Check if this error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a client-side error.
    ///
    /// Client errors are caused by the request itself and will fail the same
    /// way when retried unchanged.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }

    /// Check if the error is recoverable.
    ///
    /// Corrupted and unsupported configurations need operator intervention;
    /// persistence and I/O failures may succeed on retry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use warden_core::error::Error;
    ///
    /// assert!(Error::persistence("disk full").is_recoverable());
    /// assert!(!Error::unsupported_version("1.0.0").is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConfigurationCorrupted(_) => false,
            Self::UnsupportedSchemaVersion(_) => false,
            Self::Configuration(_) => false,
            Self::Persistence(_) | Self::Io(_) => true,
            _ => true,
        }
    }
}
