//! Unix-socket HTTP transport for the plugin protocol.
//!
//! [`dispatch`] is the socket-free core: request in, reply out. [`PluginServer`]
//! binds it to a unix socket with hyper's HTTP/1 connection driver.

pub mod server;

pub use server::{PluginServer, Reply, dispatch, handle};
