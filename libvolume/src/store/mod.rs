//! Remote configuration store.
//!
//! The store owns every remote definition; the driver never caches one. Its
//! list of remote names *is* the list of volumes.

mod file;
mod memory;

pub use file::FileRemoteStore;
pub use memory::MemoryRemoteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VolumeError;
use crate::types::{RemoteParams, RemoteStatus, TYPE_OPTION};

/// Persistent storage for named remote definitions.
///
/// Every call may observe a different external state; implementations must
/// not rely on anything the driver saw on a previous call.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Define remote `name` of backend `kind`.
    ///
    /// With `overwrite_forbidden` an existing definition makes the call fail
    /// with [`VolumeError::VolumeAlreadyExists`]; the check and the write are
    /// atomic with respect to other callers.
    async fn create_remote(
        &self,
        name: &str,
        kind: &str,
        params: RemoteParams,
        overwrite_forbidden: bool,
    ) -> Result<(), VolumeError>;

    /// Delete remote `name`. Absent names are a no-op.
    async fn delete_remote(&self, name: &str) -> Result<(), VolumeError>;

    /// Names of all defined remotes, in no particular order.
    async fn list_remote_names(&self) -> Result<Vec<String>, VolumeError>;

    /// All attributes of remote `name`, `type` included. Empty when absent.
    async fn dump_remote(&self, name: &str) -> Result<RemoteStatus, VolumeError>;
}

/// A single persisted remote definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RemoteDefinition {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    params: RemoteParams,
}

impl RemoteDefinition {
    fn new(kind: &str, mut params: RemoteParams) -> Result<Self, VolumeError> {
        if kind.is_empty() {
            return Err(VolumeError::InvalidRequest(
                "remote type must not be empty".into(),
            ));
        }
        params.remove(TYPE_OPTION);
        Ok(Self {
            kind: kind.to_owned(),
            params,
        })
    }

    fn dump(&self) -> RemoteStatus {
        let mut status = RemoteStatus::new();
        status.insert(TYPE_OPTION.to_owned(), self.kind.clone().into());
        for (key, value) in &self.params {
            status.insert(key.clone(), value.clone().into());
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_includes_type_and_params() {
        let def = RemoteDefinition::new(
            "s3",
            RemoteParams::from([("bucket".into(), "b1".into())]),
        )
        .unwrap();
        let dump = def.dump();
        assert_eq!(dump["type"], "s3");
        assert_eq!(dump["bucket"], "b1");
        assert_eq!(dump.len(), 2);
    }

    #[test]
    fn type_param_cannot_shadow_kind() {
        let def = RemoteDefinition::new(
            "s3",
            RemoteParams::from([("type".into(), "local".into())]),
        )
        .unwrap();
        assert_eq!(def.dump()["type"], "s3");
    }

    #[test]
    fn empty_kind_rejected() {
        let err = RemoteDefinition::new("", RemoteParams::new()).unwrap_err();
        assert!(matches!(err, VolumeError::InvalidRequest(_)));
    }
}
