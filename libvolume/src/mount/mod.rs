//! Mount engine abstraction.
//!
//! The driver never performs mount syscalls itself. It hands a remote
//! reference and a set of [`MountOptions`] to a [`MountEngine`], which attaches
//! a live filesystem view at the mountpoint and later detaches it.

mod command;

pub use command::{CommandMountEngine, MountCommandConfig};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::VolumeError;

/// Maximum length of a mount display label, if the platform imposes one.
#[cfg(windows)]
pub const VOLUME_LABEL_MAX: Option<usize> = Some(32);
#[cfg(not(windows))]
pub const VOLUME_LABEL_MAX: Option<usize> = None;

/// Options handed to the engine for a single attach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptions {
    /// Display label of the mounted filesystem.
    pub volume_name: String,
    pub read_only: bool,
    pub allow_other: bool,
    /// Engine-specific arguments appended verbatim.
    pub extra_args: Vec<String>,
}

/// Result of a successful attach. The driver does not retain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountHandle {
    pub mountpoint: PathBuf,
    pub remote: String,
}

/// Establishes and tears down live mounts.
#[async_trait]
pub trait MountEngine: Send + Sync {
    /// Attach `remote_ref` at `path`.
    async fn attach(
        &self,
        path: &Path,
        remote_ref: &str,
        options: &MountOptions,
    ) -> Result<MountHandle, VolumeError>;

    /// Tear down whatever is mounted at `path`. Whether an idle mountpoint is
    /// an error is up to the engine.
    async fn detach(&self, path: &Path) -> Result<(), VolumeError>;
}

/// Reference to the configured remote `name`, rooted at its top level.
pub fn remote_ref(name: &str) -> String {
    format!("{name}:")
}

/// Unsanitised label for `remote_name` rooted at `root`.
pub fn default_label(remote_name: &str, root: &str) -> String {
    format!("{remote_name}:{root}")
}

/// Turn `raw` into a display label.
///
/// Scheme (`:`) and path (`/`) separators become spaces, surrounding
/// whitespace is trimmed, and the result is cut to [`VOLUME_LABEL_MAX`].
pub fn volume_label(raw: &str) -> String {
    let sanitized = raw.replace([':', '/'], " ");
    truncate_label(sanitized.trim(), VOLUME_LABEL_MAX)
}

fn truncate_label(label: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if label.len() > max => {
            let mut end = max;
            while !label.is_char_boundary(end) {
                end -= 1;
            }
            label[..end].to_owned()
        }
        _ => label.to_owned(),
    }
}
