//! Host-facing volume plugin operations.
//!
//! One method per request kind of the host's volume plugin protocol. The
//! transport decodes a request, calls exactly one of these, and encodes the
//! result; nothing here knows about sockets or HTTP.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::VolumeError;
use crate::types::{Capability, MountRequest, RemoteParams, VolumeInfo, VolumeName};

/// Volume plugin service — lifecycle and mount management for named volumes.
#[async_trait]
pub trait VolumePlugin: Send + Sync {
    /// Create the mountpoint and define the remote. `options` must carry
    /// `type`.
    async fn create(&self, name: &VolumeName, options: RemoteParams) -> Result<(), VolumeError>;

    /// Forget the remote definition. Succeeds for unknown names.
    async fn remove(&self, name: &VolumeName) -> Result<(), VolumeError>;

    /// Every configured volume, sorted by name. `status` is left empty.
    async fn list(&self) -> Result<Vec<VolumeInfo>, VolumeError>;

    /// A single volume with its remote attributes as `status`.
    async fn get(&self, name: &VolumeName) -> Result<VolumeInfo, VolumeError>;

    /// Where the volume is (or would be) mounted.
    async fn path(&self, name: &VolumeName) -> Result<PathBuf, VolumeError>;

    /// Attach the remote at the volume's mountpoint and return that path.
    async fn mount(&self, req: &MountRequest) -> Result<PathBuf, VolumeError>;

    /// Detach whatever is mounted at the volume's mountpoint.
    async fn unmount(&self, req: &MountRequest) -> Result<(), VolumeError>;

    /// Static capability descriptor.
    async fn capabilities(&self) -> Result<Capability, VolumeError>;
}
