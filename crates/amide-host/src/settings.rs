//! Host connection settings

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default socket path when neither the settings nor the environment name one
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/amide-host.sock";

/// Environment variable for a custom socket path
pub const SOCKET_ENV_VAR: &str = "AMIDE_HOST_SOCKET";

/// How to reach the host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSettings {
    /// Socket path; falls back to `AMIDE_HOST_SOCKET`, then the default
    pub socket: Option<PathBuf>,
    /// Program started when no host is listening
    pub program: Option<PathBuf>,
    /// Arguments for `program`
    pub args: Vec<String>,
    /// Per-request timeout in seconds; 0 disables the timeout
    pub timeout_secs: u64,
    /// Identifier sent in the handshake
    pub client_id: String,
    /// Append every command to this file (`.cxc` or `.py`)
    pub transcript: Option<PathBuf>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            socket: None,
            program: None,
            args: Vec::new(),
            timeout_secs: 120,
            client_id: "amide".to_string(),
            transcript: None,
        }
    }
}

impl HostSettings {
    /// Socket path after applying the environment fallback
    pub fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(|| {
            std::env::var(SOCKET_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SOCKET_PATH))
        })
    }

    /// Request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
