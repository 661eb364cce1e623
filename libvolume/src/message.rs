//! Host volume plugin protocol messages.
//!
//! The host POSTs a JSON body to one endpoint per request kind, e.g.
//! `/VolumeDriver.Create` with `{"Name": "backup", "Opts": {"type": "s3"}}`,
//! and expects a JSON reply; failures are reported as `{"Err": "<message>"}`.
//! [`PluginRequest`] and [`PluginResponse`] are the decoded forms of those
//! bodies.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::VolumeError;
use crate::types::*;

/// Content type of every plugin response.
pub const CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1.2+json";

/// Plugin subsystem implemented by this driver, announced on activation.
pub const IMPLEMENTS: &str = "VolumeDriver";

/// Endpoint paths of the plugin protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Activate,
    Create,
    Remove,
    List,
    Get,
    Path,
    Mount,
    Unmount,
    Capabilities,
}

impl Endpoint {
    /// Map a request path to its endpoint; `None` for unknown paths.
    pub fn from_path(path: &str) -> Option<Self> {
        let endpoint = match path {
            "/Plugin.Activate" => Self::Activate,
            "/VolumeDriver.Create" => Self::Create,
            "/VolumeDriver.Remove" => Self::Remove,
            "/VolumeDriver.List" => Self::List,
            "/VolumeDriver.Get" => Self::Get,
            "/VolumeDriver.Path" => Self::Path,
            "/VolumeDriver.Mount" => Self::Mount,
            "/VolumeDriver.Unmount" => Self::Unmount,
            "/VolumeDriver.Capabilities" => Self::Capabilities,
            _ => return None,
        };
        Some(endpoint)
    }
}

// ----- Request bodies ------------------------------------------------------

#[derive(Deserialize)]
struct CreateBody {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Opts", default)]
    opts: Option<RemoteParams>,
}

#[derive(Deserialize)]
struct NameBody {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Deserialize)]
struct MountBody {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "ID", default)]
    id: String,
}

/// A decoded plugin request.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginRequest {
    /// Handshake (`/Plugin.Activate`).
    Activate,
    Create {
        name: VolumeName,
        options: RemoteParams,
    },
    Remove(VolumeName),
    List,
    Get(VolumeName),
    Path(VolumeName),
    Mount(MountRequest),
    Unmount(MountRequest),
    Capabilities,
}

impl PluginRequest {
    /// Decode the body posted to `endpoint`.
    ///
    /// Bodies of parameterless requests are ignored, so an empty body is
    /// accepted for them.
    pub fn decode(endpoint: Endpoint, body: &[u8]) -> Result<Self, VolumeError> {
        let request = match endpoint {
            Endpoint::Activate => Self::Activate,
            Endpoint::List => Self::List,
            Endpoint::Capabilities => Self::Capabilities,
            Endpoint::Create => {
                let body: CreateBody = parse(body)?;
                Self::Create {
                    name: body.name.into(),
                    options: body.opts.unwrap_or_default(),
                }
            }
            Endpoint::Remove => Self::Remove(parse::<NameBody>(body)?.name.into()),
            Endpoint::Get => Self::Get(parse::<NameBody>(body)?.name.into()),
            Endpoint::Path => Self::Path(parse::<NameBody>(body)?.name.into()),
            Endpoint::Mount => Self::Mount(parse::<MountBody>(body)?.into()),
            Endpoint::Unmount => Self::Unmount(parse::<MountBody>(body)?.into()),
        };
        Ok(request)
    }
}

impl From<MountBody> for MountRequest {
    fn from(body: MountBody) -> Self {
        Self {
            name: body.name.into(),
            id: body.id,
        }
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, VolumeError> {
    serde_json::from_slice(body)
        .map_err(|e| VolumeError::InvalidRequest(format!("malformed request body: {e}")))
}

impl fmt::Display for PluginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate => f.write_str("Activate"),
            Self::Create { name, options } => {
                write!(f, "Create(name={name}, options={})", options.len())
            }
            Self::Remove(name) => write!(f, "Remove({name})"),
            Self::List => f.write_str("List"),
            Self::Get(name) => write!(f, "Get({name})"),
            Self::Path(name) => write!(f, "Path({name})"),
            Self::Mount(req) => write!(f, "Mount({}, id={})", req.name, req.id),
            Self::Unmount(req) => write!(f, "Unmount({}, id={})", req.name, req.id),
            Self::Capabilities => f.write_str("Capabilities"),
        }
    }
}

// ----- Responses -----------------------------------------------------------

/// A plugin reply, before JSON encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginResponse {
    /// Activation handshake reply.
    Activated,
    /// Success without payload.
    Ok,
    Mountpoint(PathBuf),
    Volumes(Vec<VolumeInfo>),
    Volume(VolumeInfo),
    Capabilities(Capability),
    /// Failure message.
    Error(String),
}

impl PluginResponse {
    /// Wire form of the reply.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Activated => json!({ "Implements": [IMPLEMENTS] }),
            Self::Ok => json!({}),
            Self::Mountpoint(path) => json!({ "Mountpoint": path.to_string_lossy() }),
            Self::Volumes(volumes) => {
                let volumes: Vec<Value> = volumes.iter().map(volume_json).collect();
                json!({ "Volumes": volumes })
            }
            Self::Volume(volume) => json!({ "Volume": volume_json(volume) }),
            Self::Capabilities(cap) => json!({ "Capabilities": cap }),
            Self::Error(message) => json!({ "Err": message }),
        }
    }
}

impl From<VolumeError> for PluginResponse {
    fn from(e: VolumeError) -> Self {
        Self::Error(e.to_string())
    }
}

fn volume_json(volume: &VolumeInfo) -> Value {
    let mut value = json!({
        "Name": volume.name.as_str(),
        "Mountpoint": volume.mountpoint.to_string_lossy(),
    });
    if let Some(status) = &volume.status {
        value["Status"] = Value::Object(status.clone());
    }
    value
}
