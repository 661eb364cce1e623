use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use libvolume::DriverConfig;
use libvolume::config::{
    DEFAULT_PLUGIN_ALIAS, DEFAULT_SOCKET_DIR, DEFAULT_STORE_PATH, DEFAULT_VOLUME_ROOT,
};
use libvolume::mount::{MountCommandConfig, MountOptions};

#[derive(Parser, Debug)]
#[command(name = "rkvol")]
#[command(version, about = "Serve configured remotes on the host's volume plugin API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true, env = "RKVOL_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen on the plugin socket until interrupted
    Serve(ServeArgs),
    /// Print the volumes currently defined in the store
    List(StoreArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// JSON file at --config-file
    File,
    /// In-process only; definitions vanish on exit
    Memory,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Base directory for volume mountpoints
    #[arg(short = 'b', long = "basedir", env = "RKVOL_BASEDIR",
          default_value_os_t = default_base_dir())]
    pub base_dir: PathBuf,

    /// Where remote definitions are kept
    #[arg(long, value_enum, default_value_t = StoreKind::File, env = "RKVOL_STORE")]
    pub store: StoreKind,

    /// Remote definitions file (file store only)
    #[arg(long, env = "RKVOL_CONFIG_FILE", default_value = DEFAULT_STORE_PATH)]
    pub config_file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// GID to use for the plugin socket
    #[arg(short = 'g', long, env = "RKVOL_GID")]
    pub gid: Option<u32>,

    /// Plugin name; the socket is <socket-dir>/<alias>.sock
    #[arg(long, env = "RKVOL_ALIAS", default_value = DEFAULT_PLUGIN_ALIAS)]
    pub alias: String,

    /// Directory the host scans for plugin sockets
    #[arg(long, env = "RKVOL_SOCKET_DIR", default_value = DEFAULT_SOCKET_DIR)]
    pub socket_dir: PathBuf,

    /// Program run to attach a remote
    #[arg(long, env = "RKVOL_MOUNT_PROGRAM")]
    pub mount_program: Option<String>,

    /// Program run to detach a mountpoint
    #[arg(long, env = "RKVOL_UNMOUNT_PROGRAM")]
    pub unmount_program: Option<String>,

    /// Fixed display label for every mount (derived per volume if unset)
    #[arg(long, env = "RKVOL_VOLNAME")]
    pub volname: Option<String>,

    /// Mount every volume read-only
    #[arg(long, env = "RKVOL_READ_ONLY")]
    pub read_only: bool,

    /// Let users other than the mounting one access mounts
    #[arg(long, env = "RKVOL_ALLOW_OTHER")]
    pub allow_other: bool,

    /// Extra argument passed to the mount program (repeatable)
    #[arg(long = "mount-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub mount_args: Vec<String>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_VOLUME_ROOT).join(DEFAULT_PLUGIN_ALIAS)
}

impl StoreArgs {
    pub fn to_config(&self) -> DriverConfig {
        DriverConfig {
            base_dir: self.base_dir.clone(),
            store_path: self.config_file.clone(),
            ..Default::default()
        }
    }
}

impl ServeArgs {
    pub fn to_config(&self) -> DriverConfig {
        let mut mount_command = MountCommandConfig::default();
        if let Some(program) = &self.mount_program {
            mount_command.program = program.clone();
        }
        if let Some(program) = &self.unmount_program {
            mount_command.unmount_program = program.clone();
        }

        DriverConfig {
            gid: self.gid,
            plugin_alias: self.alias.clone(),
            socket_dir: self.socket_dir.clone(),
            mount: MountOptions {
                volume_name: self.volname.clone().unwrap_or_default(),
                read_only: self.read_only,
                allow_other: self.allow_other,
                extra_args: self.mount_args.clone(),
            },
            mount_command,
            ..self.store.to_config()
        }
    }
}
