//! Mountpoint directory management.
//!
//! Every volume is mounted at `<base_dir>/<name>`. Neither the remote store
//! nor the mount engine knows anything about directory contents, so the
//! "mountpoint must be empty" invariant is enforced here.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::VolumeError;

/// Permission bits for freshly created mountpoints.
const MOUNTPOINT_MODE: u32 = 0o700;

/// Resolves and validates mountpoint directories under a fixed base.
#[derive(Debug, Clone)]
pub struct MountpointManager {
    base_dir: PathBuf,
}

impl MountpointManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `base_dir/name`. Never touches the filesystem.
    pub fn mountpoint(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Make sure the mountpoint for `name` exists and is empty.
    ///
    /// A missing directory is created (parents included) with mode `0700`.
    /// An existing one must contain no entries at all.
    pub async fn ensure(&self, name: &str) -> Result<PathBuf, VolumeError> {
        let path = self.mountpoint(name);
        match tokio::fs::symlink_metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tokio::fs::DirBuilder::new()
                    .recursive(true)
                    .mode(MOUNTPOINT_MODE)
                    .create(&path)
                    .await
                    .map_err(|e| VolumeError::fs(&path, e))?;
                debug!(path = %path.display(), "mountpoint created");
            }
            Err(e) => return Err(VolumeError::fs(&path, e)),
        }
        check_empty(&path).await?;
        Ok(path)
    }
}

/// Fail with [`VolumeError::VolumeAlreadyExists`] unless `path` is an empty
/// directory.
pub async fn check_empty(path: &Path) -> Result<(), VolumeError> {
    if !is_empty(path).await.map_err(|e| VolumeError::fs(path, e))? {
        return Err(VolumeError::VolumeAlreadyExists(format!(
            "{} (directory exists and is not empty)",
            path.display()
        )));
    }
    Ok(())
}

/// Report whether the directory at `path` has no entries.
///
/// Reads at most one entry, so the cost does not depend on directory size.
/// Hidden entries count like any other.
pub async fn is_empty(path: &Path) -> io::Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_none())
}
