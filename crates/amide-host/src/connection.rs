//! Connection management for the geometry host
//!
//! Connects to a running host or spawns a new one from a configured
//! program, and tears down what it started when dropped.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use crate::error::{HostError, HostResult};
use crate::ipc::HostClient;
use crate::settings::{HostSettings, SOCKET_ENV_VAR};

/// A live connection to the host
pub struct HostConnection {
    /// IPC client
    client: HostClient,
    /// Child process handle (if we spawned the host)
    child: Option<Child>,
    /// Path to the IPC socket
    socket_path: Option<PathBuf>,
}

impl HostConnection {
    /// Wrap a client that is already connected (no process ownership)
    pub fn from_client(client: HostClient) -> Self {
        Self {
            client,
            child: None,
            socket_path: None,
        }
    }

    /// Mutable access to the IPC client
    pub fn client_mut(&mut self) -> &mut HostClient {
        &mut self.client
    }

    /// Check if we own (spawned) the host process
    pub fn owns_host(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for HostConnection {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        let _ = self.client.quit();
        std::thread::sleep(Duration::from_millis(100));

        if let Ok(None) = child.try_wait() {
            let _ = child.kill();
        }
        let _ = child.wait();

        if let Some(path) = &self.socket_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Establish a connection to the host
///
/// Tries an existing host at the socket path first; if none answers and a
/// program is configured, spawns it and waits for its socket.
pub fn establish_connection(settings: &HostSettings) -> HostResult<HostConnection> {
    let socket_path = settings.socket_path();
    let timeout = settings.timeout();

    if let Ok(mut client) = HostClient::connect(&socket_path, &settings.client_id, timeout) {
        match client.ping() {
            Ok(true) => {
                log::info!("Connected to running host at {:?}", socket_path);
                return Ok(HostConnection::from_client(client));
            }
            Ok(false) => log::warn!("Host at {:?} did not respond to ping", socket_path),
            Err(e) => log::warn!("Failed to ping host at {:?}: {}", socket_path, e),
        }
    }

    let program = settings.program.as_ref().ok_or_else(|| {
        HostError::connection(format!(
            "no host listening at {:?} and no host program configured",
            socket_path
        ))
    })?;

    log::info!("No running host found, starting {:?}", program);
    spawn_host(program, &settings.args, &socket_path, &settings.client_id, timeout)
}

fn spawn_host(
    program: &Path,
    args: &[String],
    socket_path: &Path,
    client_id: &str,
    timeout: Option<Duration>,
) -> HostResult<HostConnection> {
    let _ = std::fs::remove_file(socket_path);

    let mut child = Command::new(program)
        .args(args)
        .env(SOCKET_ENV_VAR, socket_path)
        .spawn()
        .map_err(|e| HostError::connection(format!("failed to start {:?}: {}", program, e)))?;

    for i in 0..50 {
        std::thread::sleep(Duration::from_millis(100));

        if let Some(status) = child.try_wait()? {
            return Err(HostError::connection(format!(
                "host exited immediately with status: {}",
                status
            )));
        }
        if socket_path.exists() {
            log::debug!("Host socket appeared after {}ms", (i + 1) * 100);
            break;
        }
    }

    let mut client = connect_with_retry(socket_path, client_id, timeout, 10)?;
    if !client.ping()? {
        let _ = child.kill();
        return Err(HostError::connection("spawned host did not answer ping"));
    }

    log::info!("Connected to spawned host at {:?}", socket_path);
    Ok(HostConnection {
        client,
        child: Some(child),
        socket_path: Some(socket_path.to_path_buf()),
    })
}

fn connect_with_retry(
    socket_path: &Path,
    client_id: &str,
    timeout: Option<Duration>,
    attempts: usize,
) -> HostResult<HostClient> {
    let mut last_error = None;
    for attempt in 1..=attempts {
        match HostClient::connect(socket_path, client_id, timeout) {
            Ok(client) => return Ok(client),
            Err(e) => {
                log::debug!("Connection attempt {}/{} failed: {}", attempt, attempts, e);
                last_error = Some(e);
                std::thread::sleep(Duration::from_millis(200));
            }
        }
    }
    Err(last_error.unwrap_or_else(|| HostError::connection("no connection attempts made")))
}
