//! Write-once local tile cache.
//!
//! One directory per dataset prefix; entries are keyed by the remote base
//! filename and never re-downloaded, overwritten or deleted. Downloads land in
//! `{name}.part` and are renamed into place, so an interrupted transfer never
//! leaves a partial file under the final name.

use crate::tile::file_name;
use crate::{EptError, ObjectStore, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TileCache {
    dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOutcome {
    pub path: PathBuf,
    /// `false` when the file was already present.
    pub downloaded: bool,
}

impl TileCache {
    /// Cache directory for `dataset_prefix` below `root`. Nothing is created yet.
    pub fn new(root: impl AsRef<Path>, dataset_prefix: &str) -> Self {
        let scoped = dataset_prefix.trim_matches('/');
        Self {
            dir: root.as_ref().join(scoped),
        }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| EptError::io(&self.dir, e))
    }

    #[inline]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }

    /// Local copy of `key`, downloading it only if it is not cached yet.
    pub fn fetch<S: ObjectStore + ?Sized>(&self, store: &S, key: &str) -> Result<CacheOutcome> {
        let path = self.path_for(key);

        if path.is_file() {
            tracing::debug!(key, path = %path.display(), "cache hit");
            return Ok(CacheOutcome {
                path,
                downloaded: false,
            });
        }

        self.ensure_dir()?;

        let mut partial = path.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        if let Err(err) = store.download(key, &partial) {
            // Only the scratch file goes; cache entries are never touched.
            let _ = fs::remove_file(&partial);
            return Err(err);
        }

        fs::rename(&partial, &path).map_err(|e| EptError::io(&path, e))?;

        tracing::debug!(key, path = %path.display(), "cached tile");
        Ok(CacheOutcome {
            path,
            downloaded: true,
        })
    }
}
