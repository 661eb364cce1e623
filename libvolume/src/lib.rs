//! # libvolume — remote-backed volume plugin driver
//!
//! `libvolume` serves the host's volume plugin protocol (create / remove /
//! list / get / path / mount / unmount / capabilities) on top of two
//! collaborators it does not own: a store of named remote definitions and a
//! mount engine that attaches a remote at a path. It follows the RK8s
//! conventions (Tokio async runtime, `tracing` for observability, `thiserror`
//! for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: `VolumeName`, `VolumeInfo`, capabilities. |
//! | [`error`] | [`VolumeError`] enum covering all failure modes. |
//! | [`plugin`] | [`VolumePlugin`] trait — one method per request kind. |
//! | [`driver`] | [`Driver`] — the lifecycle driver implementing it. |
//! | [`mountpoint`] | Mountpoint creation and emptiness checks. |
//! | [`store`] | [`RemoteStore`] trait, file and in-memory stores. |
//! | [`mount`] | [`MountEngine`] trait and the command-based engine. |
//! | [`locks`] | Per-volume-name serialisation. |
//! | [`message`] | Wire forms of plugin requests and replies. |
//! | [`transport`] | Unix-socket HTTP server built on `hyper`. |
//! | [`config`] | [`DriverConfig`] process-wide settings. |

pub mod config;
pub mod driver;
pub mod error;
pub mod locks;
pub mod message;
pub mod mount;
pub mod mountpoint;
pub mod plugin;
pub mod store;
pub mod transport;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use config::DriverConfig;
pub use driver::Driver;
pub use error::VolumeError;
pub use mount::MountEngine;
pub use plugin::VolumePlugin;
pub use store::RemoteStore;
pub use types::*;
