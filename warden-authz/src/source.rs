//! Persistence backends for the configuration document

use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;
use warden_core::model::{Configuration, MODEL_VERSION};
use warden_core::utils::json;
use warden_core::{Error, Result};

/// Loads and stores the serialized configuration document.
///
/// `load_raw` returns the document exactly as persisted, whatever its model
/// version; parsing and upgrading are left to the caller.
pub trait ConfigurationSource: Send + Sync {
    /// Read the persisted document
    fn load_raw(&self) -> Result<Vec<u8>>;

    /// Persist the given configuration, replacing the previous document
    fn store_configuration(&self, configuration: &Configuration) -> Result<()>;

    /// Short description used in log messages
    fn describe(&self) -> String;
}

/// JSON file on disk.
///
/// A missing file reads as an empty configuration at the current model
/// version. Writes go to a sibling temporary file which is then renamed over
/// the document.
#[derive(Debug, Clone)]
pub struct FileConfigurationSource {
    path: PathBuf,
}

impl FileConfigurationSource {
    /// Create a source for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigurationSource for FileConfigurationSource {
    fn load_raw(&self) -> Result<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Configuration file missing, starting empty");
                json::to_vec_pretty(&Configuration::new())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn store_configuration(&self, configuration: &Configuration) -> Result<()> {
        let bytes = json::to_vec_pretty(configuration)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, &bytes)?;
        std::fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Stored configuration");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// In-memory document, for tests and embedded use.
#[derive(Debug)]
pub struct MemoryConfigurationSource {
    document: Mutex<Vec<u8>>,
    stores: AtomicUsize,
    fail_stores: AtomicBool,
}

impl MemoryConfigurationSource {
    /// A source holding an empty configuration at the current model version
    pub fn new() -> Self {
        Self::from_bytes(format!(r#"{{"version":"{}"}}"#, MODEL_VERSION))
    }

    /// A source holding the given raw document
    pub fn from_bytes(document: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Mutex::new(document.into()),
            stores: AtomicUsize::new(0),
            fail_stores: AtomicBool::new(false),
        }
    }

    /// A source holding the given configuration
    pub fn from_configuration(configuration: &Configuration) -> Result<Self> {
        Ok(Self::from_bytes(json::to_vec_pretty(configuration)?))
    }

    /// Current raw document
    pub fn contents(&self) -> Vec<u8> {
        self.document.lock().clone()
    }

    /// Current document parsed as the current model
    pub fn stored_configuration(&self) -> Result<Configuration> {
        json::from_slice(&self.document.lock())
    }

    /// Number of successful stores
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Make subsequent stores fail with an I/O error
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryConfigurationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationSource for MemoryConfigurationSource {
    fn load_raw(&self) -> Result<Vec<u8>> {
        Ok(self.contents())
    }

    fn store_configuration(&self, configuration: &Configuration) -> Result<()> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("store disabled")));
        }

        let bytes = json::to_vec_pretty(configuration)?;
        *self.document.lock() = bytes;
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use warden_core::model::User;

    #[test]
    fn test_missing_file_reads_as_empty_configuration() {
        let dir = TempDir::new().unwrap();
        let source = FileConfigurationSource::new(dir.path().join("security.json"));

        let configuration: Configuration = json::from_slice(&source.load_raw().unwrap()).unwrap();
        assert!(configuration.is_current());
        assert!(configuration.users.is_empty());
    }

    #[test]
    fn test_file_store_replaces_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("security.json");
        let source = FileConfigurationSource::new(&path);

        let mut configuration = Configuration::new();
        configuration.users.push(User::local("jdoe"));
        source.store_configuration(&configuration).unwrap();

        let loaded: Configuration = json::from_slice(&source.load_raw().unwrap()).unwrap();
        assert_eq!(loaded, configuration);
        assert!(!source.temp_path().exists());
    }

    #[test]
    fn test_memory_source_can_fail_stores() {
        let source = MemoryConfigurationSource::new();
        source.fail_stores(true);
        assert!(matches!(
            source.store_configuration(&Configuration::new()),
            Err(Error::Io(_))
        ));
        assert_eq!(source.store_count(), 0);
    }
}
