//! Per-target records of what has already been downloaded.

mod loader;
mod registry;
mod store;

pub use loader::IndexLoader;
pub use registry::IndexRegistry;
pub use store::{FsIndexStore, IndexStore};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ContentKind;
use crate::target::{Target, TargetVariant};

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Name of the file on disk.
    pub file_name: String,
    pub kind: ContentKind,
}

/// The identifiers already downloaded for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub variant: TargetVariant,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    entries: BTreeMap<String, IndexEntry>,
}

fn default_version() -> u32 {
    INDEX_VERSION
}

impl Index {
    pub fn empty(name: impl Into<String>, variant: TargetVariant) -> Self {
        Self {
            name: name.into(),
            variant,
            version: INDEX_VERSION,
            entries: BTreeMap::new(),
        }
    }

    pub fn for_target(target: &Target) -> Self {
        Self::empty(target.name(), target.variant)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns false when `id` was already present.
    pub fn insert(&mut self, id: impl Into<String>, entry: IndexEntry) -> bool {
        self.entries.insert(id.into(), entry).is_none()
    }

    /// Add new entries, returning how many were not yet present.
    pub fn extend<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, IndexEntry)>,
    {
        let mut added = 0;
        for (id, entry) in entries {
            if self.insert(id, entry) {
                added += 1;
            }
        }
        added
    }
}
