//! IPC with the geometry host
//!
//! Line-delimited JSON over a Unix domain socket.

#[cfg(unix)]
mod client;
mod protocol;

#[cfg(unix)]
pub use client::HostClient;
pub use protocol::{HostRequest, HostResponse};
