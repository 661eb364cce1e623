//! Mount engine that shells out to an external FUSE helper.
//!
//! Attach runs a configurable mount program (by default `rclone mount ...
//! --daemon`, which returns once the mount is live). Detach runs
//! `fusermount3 -u <path>`.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::{MountEngine, MountHandle, MountOptions};
use crate::error::VolumeError;

/// Command templates used by [`CommandMountEngine`].
///
/// `args` may contain the placeholders `{remote}`, `{mountpoint}` and
/// `{volname}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCommandConfig {
    pub program: String,
    pub args: Vec<String>,
    pub unmount_program: String,
    pub unmount_args: Vec<String>,
}

impl Default for MountCommandConfig {
    fn default() -> Self {
        Self {
            program: "rclone".to_owned(),
            args: ["mount", "{remote}", "{mountpoint}", "--volname", "{volname}", "--daemon"]
                .map(str::to_owned)
                .to_vec(),
            unmount_program: "fusermount3".to_owned(),
            unmount_args: vec!["-u".to_owned()],
        }
    }
}

/// [`MountEngine`] backed by external programs.
#[derive(Debug, Clone, Default)]
pub struct CommandMountEngine {
    config: MountCommandConfig,
}

impl CommandMountEngine {
    pub fn new(config: MountCommandConfig) -> Self {
        Self { config }
    }

    /// Full argument list for attaching `remote_ref` at `path`.
    fn mount_args(&self, path: &Path, remote_ref: &str, options: &MountOptions) -> Vec<String> {
        let mountpoint = path.to_string_lossy();
        let mut args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{remote}", remote_ref)
                    .replace("{mountpoint}", &mountpoint)
                    .replace("{volname}", &options.volume_name)
            })
            .collect();
        if options.read_only {
            args.push("--read-only".to_owned());
        }
        if options.allow_other {
            args.push("--allow-other".to_owned());
        }
        args.extend(options.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl MountEngine for CommandMountEngine {
    #[instrument(skip(self, options), fields(path = %path.display()))]
    async fn attach(
        &self,
        path: &Path,
        remote_ref: &str,
        options: &MountOptions,
    ) -> Result<MountHandle, VolumeError> {
        let args = self.mount_args(path, remote_ref, options);
        debug!(program = %self.config.program, ?args, "spawning mount helper");

        let output = Command::new(&self.config.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| VolumeError::MountFailed {
                path: path.display().to_string(),
                reason: format!("spawn {}: {e}", self.config.program),
            })?;

        if !output.status.success() {
            return Err(VolumeError::MountFailed {
                path: path.display().to_string(),
                reason: failure_reason(&self.config.program, &output),
            });
        }

        info!(%remote_ref, "remote attached");
        Ok(MountHandle {
            mountpoint: path.to_path_buf(),
            remote: remote_ref.to_owned(),
        })
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn detach(&self, path: &Path) -> Result<(), VolumeError> {
        let output = Command::new(&self.config.unmount_program)
            .args(&self.config.unmount_args)
            .arg(path)
            .output()
            .await
            .map_err(|e| VolumeError::UnmountFailed {
                path: path.display().to_string(),
                reason: format!("spawn {}: {e}", self.config.unmount_program),
            })?;

        if !output.status.success() {
            return Err(VolumeError::UnmountFailed {
                path: path.display().to_string(),
                reason: failure_reason(&self.config.unmount_program, &output),
            });
        }

        info!("mountpoint detached");
        Ok(())
    }
}

fn failure_reason(program: &str, output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{program} exited with {}", output.status)
    } else {
        format!("{program}: {stderr}")
    }
}
