//! Core volume types shared by the driver, its collaborators and the
//! transport.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Name of a volume. Doubles as the key of its remote definition in the
/// configuration store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VolumeName(pub String);

impl VolumeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for VolumeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Remote definitions
// ---------------------------------------------------------------------------

/// Option key naming the backend kind of a remote. Mandatory on create.
pub const TYPE_OPTION: &str = "type";

/// Parameters of a remote definition, i.e. every create option except
/// [`TYPE_OPTION`].
pub type RemoteParams = BTreeMap<String, String>;

/// Attribute dump of a remote definition as returned by the store.
pub type RemoteStatus = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Whether volumes are valid on a single node or across a cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Global,
}

/// Capabilities advertised to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capability {
    #[serde(rename = "Scope")]
    pub scope: Scope,
}

// ---------------------------------------------------------------------------
// Volume metadata
// ---------------------------------------------------------------------------

/// A volume as reported by list and get.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeInfo {
    pub name: VolumeName,
    /// Always `base_dir/name`.
    pub mountpoint: PathBuf,
    /// Remote attributes, present on get only.
    pub status: Option<RemoteStatus>,
}

/// Context of a mount call; the host sends a caller ID with every
/// mount/unmount pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub name: VolumeName,
    pub id: String,
}
