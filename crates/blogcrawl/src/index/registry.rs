use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use super::{Index, IndexStore};
use crate::error::IndexLoadError;
use crate::target::TargetVariant;

/// Every stored index, loaded once and shared read-only between runs.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indices: FxHashMap<(String, TargetVariant), Arc<Index>>,
}

impl IndexRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: impl IntoIterator<Item = Index>) -> Self {
        let mut map = FxHashMap::default();
        for index in indices {
            let key = (index.name.clone(), index.variant);
            if map.insert(key, Arc::new(index)).is_some() {
                warn!("Duplicate index in registry, keeping the last one");
            }
        }
        Self { indices: map }
    }

    pub fn load(store: &dyn IndexStore) -> Result<Self, IndexLoadError> {
        let registry = Self::from_indices(store.enumerate_all()?);
        info!(indices = registry.len(), "Loaded index registry");
        Ok(registry)
    }

    pub fn lookup(&self, name: &str, variant: TargetVariant) -> Option<Arc<Index>> {
        self.indices.get(&(name.to_owned(), variant)).cloned()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
