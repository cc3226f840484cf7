//! Lazily loaded, invalidatable store

use parking_lot::Mutex;
use tracing::debug;
use warden_core::Result;
use warden_core::store::ConfigStore;

type Loader = Box<dyn Fn() -> Result<ConfigStore> + Send + Sync>;

/// Holds the live [`ConfigStore`], building it on first access.
///
/// The loader runs with the cache lock held, so after an
/// [`invalidate`](Self::invalidate) exactly one caller rebuilds the store
/// while the others wait for it. A failed load leaves the cache empty and is
/// retried on the next access.
pub struct ConfigCache {
    store: Mutex<Option<ConfigStore>>,
    loader: Loader,
}

impl ConfigCache {
    /// Create an empty cache with the given loader
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<ConfigStore> + Send + Sync + 'static,
    {
        Self {
            store: Mutex::new(None),
            loader: Box::new(loader),
        }
    }

    /// Run `f` against the store, loading it first if needed
    pub fn with<R>(&self, f: impl FnOnce(&ConfigStore) -> R) -> Result<R> {
        let mut guard = self.store.lock();
        let store = Self::ensure_loaded(&mut guard, &self.loader)?;
        Ok(f(store))
    }

    /// Run `f` against the store mutably, loading it first if needed
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ConfigStore) -> R) -> Result<R> {
        let mut guard = self.store.lock();
        let store = Self::ensure_loaded(&mut guard, &self.loader)?;
        Ok(f(store))
    }

    /// Owned snapshot of the store
    pub fn get(&self) -> Result<ConfigStore> {
        self.with(ConfigStore::clone)
    }

    /// Drop the loaded store; the next access reloads it
    pub fn invalidate(&self) {
        let mut guard = self.store.lock();
        if guard.take().is_some() {
            debug!("Configuration cache invalidated");
        }
    }

    /// Whether a store is currently loaded
    pub fn is_loaded(&self) -> bool {
        self.store.lock().is_some()
    }

    fn ensure_loaded<'a>(
        slot: &'a mut Option<ConfigStore>,
        loader: &Loader,
    ) -> Result<&'a mut ConfigStore> {
        let store = match slot.take() {
            Some(store) => store,
            None => {
                debug!("Loading configuration into cache");
                loader()?
            }
        };
        Ok(slot.insert(store))
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
