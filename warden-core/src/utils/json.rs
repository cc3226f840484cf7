//! JSON helpers shared by the persistence backends and the upgrade chain.
//!
//! All functions map `serde_json` failures to [`Error::Serialization`] so
//! callers can tell a malformed document apart from an I/O failure.

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Parse a value from a byte slice.
pub fn from_slice<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(Error::Serialization)
}

/// Serialize a value to pretty printed JSON bytes, as written to disk.
pub fn to_vec_pretty<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    serde_json::to_vec_pretty(value).map_err(Error::Serialization)
}

/// Read a top-level string field without assuming anything else about the
/// document's shape.
///
/// Returns `Ok(None)` when the document is a JSON object without the field
/// (or with a non-string value there).
///
/// # Examples
///
/// ```rust
/// use warden_core::utils::json::read_string_field;
///
/// let version = read_string_field(br#"{"version": "2.0.4", "users": []}"#, "version").unwrap();
/// assert_eq!(version.as_deref(), Some("2.0.4"));
/// ```
pub fn read_string_field(bytes: &[u8], field: &str) -> Result<Option<String>> {
    let document: serde_json::Value = from_slice(bytes)?;
    Ok(document
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_string_field_missing() {
        assert_eq!(read_string_field(b"{}", "version").unwrap(), None);
        assert_eq!(read_string_field(br#"{"version": 3}"#, "version").unwrap(), None);
    }

    #[test]
    fn test_malformed_document_is_serialization_error() {
        let error = read_string_field(b"{not json", "version").unwrap_err();
        assert!(matches!(error, Error::Serialization(_)));
    }
}
