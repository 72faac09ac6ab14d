use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::Index;
use crate::error::IndexLoadError;
use crate::target::{Target, TargetVariant};

/// Persistent index storage.
///
/// Reads may run concurrently. Writes happen once a run has finished and
/// are serialized by the caller.
pub trait IndexStore: Send + Sync {
    /// The stored index for `target`, or `None` when it was never written.
    fn read_index(&self, target: &Target) -> Result<Option<Index>, IndexLoadError>;

    /// Every stored index.
    fn enumerate_all(&self) -> Result<Vec<Index>, IndexLoadError>;

    fn write_index(&self, index: &Index) -> io::Result<()>;
}

/// One JSON file per target: `<dir>/<name>_files.<variant suffix>`.
#[derive(Debug, Clone)]
pub struct FsIndexStore {
    dir: PathBuf,
}

const FILE_MARKER: &str = "_files.";

impl FsIndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str, variant: TargetVariant) -> PathBuf {
        self.dir.join(format!(
            "{}{}{}",
            pipeline_common::sanitize_filename(name),
            FILE_MARKER,
            variant.index_suffix()
        ))
    }

    fn read_path(path: &Path) -> Result<Option<Index>, IndexLoadError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IndexLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| IndexLoadError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl IndexStore for FsIndexStore {
    fn read_index(&self, target: &Target) -> Result<Option<Index>, IndexLoadError> {
        let path = self.path_for(target.name(), target.variant);
        let index = Self::read_path(&path)?;
        debug!(path = %path.display(), found = index.is_some(), "Read index");
        Ok(index)
    }

    fn enumerate_all(&self) -> Result<Vec<Index>, IndexLoadError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(IndexLoadError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IndexLoadError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.rsplit_once(FILE_MARKER))
                .is_some_and(|(_, suffix)| TargetVariant::from_index_suffix(suffix).is_some());
            if is_index {
                paths.push(path);
            }
        }
        paths.sort();

        let mut indices = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(index) = Self::read_path(&path)? {
                indices.push(index);
            } else {
                warn!(path = %path.display(), "Index vanished while enumerating");
            }
        }
        debug!(dir = %self.dir.display(), count = indices.len(), "Enumerated indices");
        Ok(indices)
    }

    fn write_index(&self, index: &Index) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&index.name, index.variant);
        let tmp = path.with_extension("tmp");
        let data = serde_json::to_vec_pretty(index)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), entries = index.len(), "Wrote index");
        Ok(())
    }
}
