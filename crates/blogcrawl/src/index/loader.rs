use std::sync::Arc;

use tracing::debug;

use super::{Index, IndexRegistry, IndexStore};
use crate::error::IndexLoadError;
use crate::target::Target;

/// Resolves the index a pipeline starts from.
///
/// With `load_all` set, indices come from the shared registry and a target
/// with no stored index gets a fresh empty one. Otherwise the target's own
/// index is read from the store on each call.
#[derive(Clone)]
pub struct IndexLoader {
    store: Arc<dyn IndexStore>,
    registry: Arc<IndexRegistry>,
    load_all: bool,
}

impl IndexLoader {
    pub fn new(store: Arc<dyn IndexStore>, registry: Arc<IndexRegistry>, load_all: bool) -> Self {
        Self {
            store,
            registry,
            load_all,
        }
    }

    /// Per-target loading without a registry.
    pub fn per_target(store: Arc<dyn IndexStore>) -> Self {
        Self::new(store, Arc::new(IndexRegistry::empty()), false)
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    pub fn load(&self, target: &Target) -> Result<Arc<Index>, IndexLoadError> {
        if self.load_all {
            let index = self
                .registry
                .lookup(target.name(), target.variant)
                .unwrap_or_else(|| Arc::new(Index::for_target(target)));
            debug!(target_name = %target.name(), entries = index.len(), "Index from registry");
            return Ok(index);
        }

        let index = self
            .store
            .read_index(target)?
            .unwrap_or_else(|| Index::for_target(target));
        debug!(target_name = %target.name(), entries = index.len(), "Index from store");
        Ok(Arc::new(index))
    }
}

impl std::fmt::Debug for IndexLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexLoader")
            .field("registry", &self.registry.len())
            .field("load_all", &self.load_all)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FsIndexStore;
    use crate::target::{TargetIdentity, TargetVariant};

    #[test]
    fn test_load_all_without_match_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn IndexStore> = Arc::new(FsIndexStore::new(dir.path()));
        store
            .write_index(&Index::empty("other", TargetVariant::PublicBlog))
            .unwrap();
        let registry = Arc::new(IndexRegistry::load(store.as_ref()).unwrap());
        let loader = IndexLoader::new(store, registry, true);

        let target = Target::new(TargetVariant::PublicBlog, TargetIdentity::new("staff", 3));
        let index = loader.load(&target).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.name, "staff");
        assert_eq!(index.variant, TargetVariant::PublicBlog);
    }

    #[test]
    fn test_per_target_reads_store() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn IndexStore> = Arc::new(FsIndexStore::new(dir.path()));
        let loader = IndexLoader::per_target(store.clone());
        let target = Target::new(TargetVariant::LikedFeed, TargetIdentity::new("staff", 3));
        assert!(loader.load(&target).unwrap().is_empty());

        let mut index = Index::for_target(&target);
        index.insert(
            "x.gif",
            crate::index::IndexEntry {
                file_name: "x.gif".into(),
                kind: crate::model::ContentKind::Photo,
            },
        );
        store.write_index(&index).unwrap();
        assert!(loader.load(&target).unwrap().contains("x.gif"));
    }
}
