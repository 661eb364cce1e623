//! Volume driver error types.
//!
//! Every fallible operation in `libvolume` returns a [`VolumeError`]. The
//! driver never recovers from collaborator failures: whatever the directory
//! layer, the remote store or the mount engine reports is handed back to the
//! transport, which renders it as the host's `{"Err": "..."}` body.

use std::path::Path;

use thiserror::Error;

/// Unified error type for volume driver operations.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// The request is missing a mandatory option or is otherwise malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The mountpoint is not empty, or the remote name is already configured.
    #[error("volume {0} already exists")]
    VolumeAlreadyExists(String),

    /// No remote definition exists for the requested name.
    #[error("volume {0} not found")]
    VolumeNotFound(String),

    /// A directory stat, create or read failed.
    #[error("{path}: {source}")]
    Filesystem {
        /// Path the failing filesystem call was made against.
        path: String,
        /// Underlying I/O error, unchanged.
        #[source]
        source: std::io::Error,
    },

    /// The mount engine failed to attach the remote.
    #[error("mount failed at {path}: {reason}")]
    MountFailed {
        /// Mountpoint the attach was attempted at.
        path: String,
        /// Failure reported by the engine.
        reason: String,
    },

    /// The mount engine failed to detach the mountpoint.
    #[error("unmount failed at {path}: {reason}")]
    UnmountFailed {
        /// Mountpoint the detach was attempted at.
        path: String,
        /// Failure reported by the engine.
        reason: String,
    },

    /// The remote configuration store could not be read or written.
    #[error("config store error: {0}")]
    Store(String),

    /// A socket / HTTP level error.
    #[error("transport error: {0}")]
    Transport(String),
}

impl VolumeError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Create a [`VolumeError::Store`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn store<E: std::fmt::Display>(e: E) -> Self {
        Self::Store(e.to_string())
    }

    /// Create a [`VolumeError::Transport`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }
}
