//! In-process remote store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;

use super::{RemoteDefinition, RemoteStore};
use crate::error::VolumeError;
use crate::types::{RemoteParams, RemoteStatus};

/// Remote store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryRemoteStore {
    remotes: DashMap<String, RemoteDefinition>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn create_remote(
        &self,
        name: &str,
        kind: &str,
        params: RemoteParams,
        overwrite_forbidden: bool,
    ) -> Result<(), VolumeError> {
        let definition = RemoteDefinition::new(kind, params)?;
        match self.remotes.entry(name.to_owned()) {
            Entry::Occupied(_) if overwrite_forbidden => {
                return Err(VolumeError::VolumeAlreadyExists(name.to_owned()));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(definition);
            }
            Entry::Vacant(entry) => {
                entry.insert(definition);
            }
        }
        info!(%name, %kind, "remote defined");
        Ok(())
    }

    async fn delete_remote(&self, name: &str) -> Result<(), VolumeError> {
        if self.remotes.remove(name).is_some() {
            info!(%name, "remote deleted");
        }
        Ok(())
    }

    async fn list_remote_names(&self) -> Result<Vec<String>, VolumeError> {
        Ok(self.remotes.iter().map(|e| e.key().clone()).collect())
    }

    async fn dump_remote(&self, name: &str) -> Result<RemoteStatus, VolumeError> {
        Ok(self
            .remotes
            .get(name)
            .map(|def| def.dump())
            .unwrap_or_default())
    }
}
