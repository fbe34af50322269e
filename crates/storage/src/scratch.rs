//! Scoped local scratch space for one unit of work.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use cyclone_common::{CycloneError, CycloneResult};

/// A local directory removed when dropped, on success and failure alike.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory below `root`, or the system temp dir.
    pub fn new(root: Option<&Path>, label: &str) -> CycloneResult<Self> {
        let prefix = format!("{}-", label);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| CycloneError::StorageError(format!("Failed to create scratch dir: {}", e)))?;

        debug!(path = %dir.path().display(), "Created scratch dir");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
