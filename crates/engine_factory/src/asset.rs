//! Asset loading and the blueprint cache.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use engine_component::fnv1a;
use tracing::{debug, error};

use crate::error::FactoryError;

/// Synchronously loads the raw bytes of a named asset.
pub trait AssetLoader: Send + Sync {
    /// Bytes of `filename`, or `None` if it cannot be loaded.
    fn load(&self, filename: &str) -> Option<Vec<u8>>;
}

impl<F> AssetLoader for F
where
    F: Fn(&str) -> Option<Vec<u8>> + Send + Sync,
{
    fn load(&self, filename: &str) -> Option<Vec<u8>> {
        self(filename)
    }
}

/// Loads assets from files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for DirectoryLoader {
    fn load(&self, filename: &str) -> Option<Vec<u8>> {
        let path = self.root.join(filename);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!(path = %path.display(), %err, "failed to read asset");
                None
            }
        }
    }
}

/// Loaded-but-unparsed blueprint assets, keyed by the FNV-1a hash of the
/// resolved filename.
#[derive(Debug, Default)]
pub struct BlueprintCache {
    assets: HashMap<u64, Arc<[u8]>>,
}

impl BlueprintCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached bytes of `filename`, loading them through `loader`
    /// on a miss. Failed loads are not cached.
    ///
    /// # Errors
    ///
    /// [`FactoryError::MissingAsset`] if the loader has nothing for
    /// `filename`, [`FactoryError::EmptyAsset`] if it returns no bytes.
    pub fn get_or_load(
        &mut self,
        filename: &str,
        loader: &dyn AssetLoader,
    ) -> Result<Arc<[u8]>, FactoryError> {
        let key = fnv1a(filename);
        if let Some(asset) = self.assets.get(&key) {
            return Ok(Arc::clone(asset));
        }
        let bytes = loader
            .load(filename)
            .ok_or_else(|| FactoryError::MissingAsset(filename.to_string()))?;
        if bytes.is_empty() {
            return Err(FactoryError::EmptyAsset(filename.to_string()));
        }
        debug!(filename, size = bytes.len(), "cached blueprint asset");
        let asset: Arc<[u8]> = bytes.into();
        self.assets.insert(key, Arc::clone(&asset));
        Ok(asset)
    }

    /// Evicts `filename`. Returns `true` if it was cached.
    pub fn release(&mut self, filename: &str) -> bool {
        self.assets.remove(&fnv1a(filename)).is_some()
    }

    #[must_use]
    pub fn contains(&self, filename: &str) -> bool {
        self.assets.contains_key(&fnv1a(filename))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
