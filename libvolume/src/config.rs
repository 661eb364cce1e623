//! Driver configuration.
//!
//! Everything here is fixed for the lifetime of the process. The `rkvol`
//! binary fills it from command-line flags and `RKVOL_*` environment
//! variables.

use std::path::{Path, PathBuf};

use crate::mount::{MountCommandConfig, MountOptions};

/// Default plugin name; also the socket file stem.
pub const DEFAULT_PLUGIN_ALIAS: &str = "rkvol";

/// Root under which plugin-managed volume directories conventionally live.
pub const DEFAULT_VOLUME_ROOT: &str = "/var/lib/docker-volumes";

/// Default location of the remote definitions file.
pub const DEFAULT_STORE_PATH: &str = "/var/lib/rkvol/remotes.json";

/// Directory the host scans for plugin sockets.
pub const DEFAULT_SOCKET_DIR: &str = "/run/docker/plugins";

/// Settings shared by the driver, its collaborators and the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Root of every mountpoint.
    pub base_dir: PathBuf,
    /// Group given to the plugin socket.
    pub gid: Option<u32>,
    pub plugin_alias: String,
    pub socket_dir: PathBuf,
    /// JSON file holding remote definitions.
    pub store_path: PathBuf,
    /// Applied to every mount.
    pub mount: MountOptions,
    pub mount_command: MountCommandConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_dir: Path::new(DEFAULT_VOLUME_ROOT).join(DEFAULT_PLUGIN_ALIAS),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            gid: None,
            plugin_alias: DEFAULT_PLUGIN_ALIAS.to_owned(),
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            mount: MountOptions::default(),
            mount_command: MountCommandConfig::default(),
        }
    }
}

impl DriverConfig {
    /// `<socket_dir>/<plugin_alias>.sock`
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.join(format!("{}.sock", self.plugin_alias))
    }
}
