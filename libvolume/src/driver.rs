//! The volume lifecycle driver.
//!
//! [`Driver`] maps each [`VolumePlugin`] call onto the remote store, the
//! mountpoint directories and the mount engine. It keeps no volume registry
//! of its own: a volume exists exactly as long as the store holds a remote of
//! that name, and "currently mounted" is never tracked.
//!
//! # Known inconsistency
//!
//! Create is not transactional. If the store rejects the definition after the
//! mountpoint was created, the (empty) directory stays behind. A later create
//! of the same name succeeds against it, so callers recover by retrying.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::error::VolumeError;
use crate::locks::NameLocks;
use crate::mount::{self, MountEngine, MountOptions};
use crate::mountpoint::MountpointManager;
use crate::plugin::VolumePlugin;
use crate::store::RemoteStore;
use crate::types::*;

/// Volume plugin backed by a [`RemoteStore`] and a [`MountEngine`].
pub struct Driver<S, M> {
    mountpoints: MountpointManager,
    store: S,
    engine: M,
    /// Template for every attach; an empty `volume_name` is derived per
    /// volume.
    mount_defaults: MountOptions,
    locks: NameLocks,
}

impl<S, M> Driver<S, M>
where
    S: RemoteStore,
    M: MountEngine,
{
    /// * `base_dir` — root of every mountpoint, fixed for the driver's life
    /// * `store` — remote configuration store
    /// * `engine` — mount engine
    pub fn new(base_dir: impl Into<PathBuf>, store: S, engine: M) -> Self {
        Self {
            mountpoints: MountpointManager::new(base_dir),
            store,
            engine,
            mount_defaults: MountOptions::default(),
            locks: NameLocks::new(),
        }
    }

    /// Options applied to every mount.
    pub fn with_mount_defaults(mut self, options: MountOptions) -> Self {
        self.mount_defaults = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &M {
        &self.engine
    }

    fn mount_options(&self, name: &str) -> MountOptions {
        let mut options = self.mount_defaults.clone();
        let raw = if options.volume_name.is_empty() {
            mount::default_label(name, "")
        } else {
            options.volume_name.clone()
        };
        options.volume_name = mount::volume_label(&raw);
        options
    }
}

/// Reject names that would resolve outside the base directory.
fn validate_name(name: &str) -> Result<(), VolumeError> {
    if name.is_empty() {
        return Err(VolumeError::InvalidRequest(
            "volume name must not be empty".into(),
        ));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(VolumeError::InvalidRequest(format!(
            "invalid volume name {name:?}"
        )));
    }
    Ok(())
}

#[async_trait]
impl<S, M> VolumePlugin for Driver<S, M>
where
    S: RemoteStore,
    M: MountEngine,
{
    #[instrument(skip(self, options), fields(name = %name))]
    async fn create(
        &self,
        name: &VolumeName,
        mut options: RemoteParams,
    ) -> Result<(), VolumeError> {
        let Some(kind) = options.remove(TYPE_OPTION) else {
            return Err(VolumeError::InvalidRequest("missing `type` option".into()));
        };
        validate_name(name.as_str())?;

        let _guard = self.locks.lock(name.as_str()).await;
        let mountpoint = self.mountpoints.ensure(name.as_str()).await?;

        if let Err(e) = self
            .store
            .create_remote(name.as_str(), &kind, options, true)
            .await
        {
            warn!(
                mountpoint = %mountpoint.display(),
                error = %e,
                "remote definition failed, mountpoint left in place",
            );
            return Err(e);
        }

        info!(%kind, mountpoint = %mountpoint.display(), "volume created");
        Ok(())
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn remove(&self, name: &VolumeName) -> Result<(), VolumeError> {
        let _guard = self.locks.lock(name.as_str()).await;
        self.store.delete_remote(name.as_str()).await?;

        info!("volume removed");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<VolumeInfo>, VolumeError> {
        let mut names = self.store.list_remote_names().await?;
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| VolumeInfo {
                mountpoint: self.mountpoints.mountpoint(&name),
                name: VolumeName(name),
                status: None,
            })
            .collect())
    }

    async fn get(&self, name: &VolumeName) -> Result<VolumeInfo, VolumeError> {
        let status = self.store.dump_remote(name.as_str()).await?;
        if status.is_empty() {
            return Err(VolumeError::VolumeNotFound(name.to_string()));
        }
        Ok(VolumeInfo {
            name: name.clone(),
            mountpoint: self.mountpoints.mountpoint(name.as_str()),
            status: Some(status),
        })
    }

    async fn path(&self, name: &VolumeName) -> Result<PathBuf, VolumeError> {
        Ok(self.mountpoints.mountpoint(name.as_str()))
    }

    #[instrument(skip(self), fields(name = %req.name, id = %req.id))]
    async fn mount(&self, req: &MountRequest) -> Result<PathBuf, VolumeError> {
        let name = req.name.as_str();
        validate_name(name)?;
        let _guard = self.locks.lock(name).await;

        if self.store.dump_remote(name).await?.is_empty() {
            return Err(VolumeError::VolumeNotFound(name.to_owned()));
        }
        let mountpoint = self.mountpoints.ensure(name).await?;

        let options = self.mount_options(name);
        let remote = mount::remote_ref(name);
        debug!(
            %remote,
            volname = %options.volume_name,
            mountpoint = %mountpoint.display(),
            "mounting",
        );

        let handle = self.engine.attach(&mountpoint, &remote, &options).await?;
        info!(mountpoint = %handle.mountpoint.display(), "volume mounted");
        Ok(mountpoint)
    }

    #[instrument(skip(self), fields(name = %req.name, id = %req.id))]
    async fn unmount(&self, req: &MountRequest) -> Result<(), VolumeError> {
        let name = req.name.as_str();
        validate_name(name)?;
        let _guard = self.locks.lock(name).await;

        let mountpoint = self.mountpoints.mountpoint(name);
        self.engine.detach(&mountpoint).await?;
        info!(mountpoint = %mountpoint.display(), "volume unmounted");
        Ok(())
    }

    async fn capabilities(&self) -> Result<Capability, VolumeError> {
        // Mountpoints are node-local.
        Ok(Capability {
            scope: Scope::Local,
        })
    }
}
