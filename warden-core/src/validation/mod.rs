//! Structural and referential validation
//!
//! Validation runs against a [`ValidationContext`], a read-only snapshot of
//! the identities already present in the store, and produces a
//! [`ValidationResponse`] listing every problem found. Errors block the
//! mutation; warnings report defects the validator corrected in place (for
//! example a missing name filled in from the id).

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod context;
pub mod descriptors;
pub mod inheritance;
pub mod validator;

pub use context::ValidationContext;
pub use descriptors::{PrivilegeDescriptor, PrivilegeDescriptors};
pub use inheritance::PrivilegeInheritance;
pub use validator::{EmailPolicy, Validator};

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    /// Field or entity the message refers to; `*` for the entity as a whole
    pub key: String,
    /// Human readable description
    pub message: String,
}

impl ValidationMessage {
    /// Create a new message
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Outcome of validating one entity or a whole model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// Blocking problems, in discovery order
    pub errors: Vec<ValidationMessage>,
    /// Corrected problems, in discovery order
    pub warnings: Vec<ValidationMessage>,
    /// Whether the validated entity was changed by auto-correction
    pub modified: bool,
}

impl ValidationResponse {
    /// Create an empty (valid) response
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a blocking error
    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationMessage::new(key, message));
    }

    /// Record a warning
    pub fn add_warning(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationMessage::new(key, message));
    }

    /// Valid iff no errors were recorded
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append the findings of another response
    pub fn append(&mut self, other: ValidationResponse) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.modified |= other.modified;
    }

    /// Turn the response into a `Result`, keeping warnings on success
    pub fn into_result(self) -> crate::Result<ValidationResponse> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(crate::Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        )?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_block() {
        let mut response = ValidationResponse::new();
        response.add_warning("name", "Fixed empty name");
        assert!(response.is_valid());
        assert!(response.into_result().is_ok());
    }

    #[test]
    fn test_display_lists_errors() {
        let mut response = ValidationResponse::new();
        response.add_error("id", "Role ID is required");
        assert_eq!(
            response.to_string(),
            "1 error(s), 0 warning(s); id: Role ID is required"
        );
    }
}
