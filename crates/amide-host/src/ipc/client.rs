//! Host IPC client
//!
//! Connects to the host over a Unix domain socket and performs blocking
//! request/response exchanges with a configurable timeout.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use super::protocol::{HostRequest, HostResponse};
use crate::error::{HostError, HostResult};

/// IPC client for one host session
pub struct HostClient {
    /// Write half
    stream: UnixStream,
    /// Buffered read half
    reader: BufReader<UnixStream>,
    /// Start of a response line cut short by a read timeout
    pending: Vec<u8>,
    /// Next request ID
    next_id: u64,
    /// Read/write timeout
    timeout: Option<Duration>,
}

impl HostClient {
    /// Connect to the host and perform the handshake
    ///
    /// # Arguments
    /// * `socket_path` - Path to the Unix domain socket
    /// * `client_id` - Identifier sent to the host during handshake
    /// * `timeout` - Per-request timeout; `None` blocks indefinitely
    pub fn connect(
        socket_path: &Path,
        client_id: &str,
        timeout: Option<Duration>,
    ) -> HostResult<Self> {
        log::info!("Connecting to host at {:?}", socket_path);
        let stream = UnixStream::connect(socket_path)?;
        let mut client = Self::from_stream(stream, timeout)?;
        client.handshake(client_id)?;
        Ok(client)
    }

    /// Wrap an already connected stream without a handshake
    pub fn from_stream(stream: UnixStream, timeout: Option<Duration>) -> HostResult<Self> {
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        let reader = BufReader::new(stream.try_clone()?);

        Ok(Self {
            stream,
            reader,
            pending: Vec::new(),
            next_id: 1,
            timeout,
        })
    }

    fn handshake(&mut self, client_id: &str) -> HostResult<()> {
        self.send(&HostRequest::Hello {
            client_id: client_id.to_string(),
        })?;
        match self.recv()? {
            HostResponse::Error { message, .. } => Err(HostError::connection(format!(
                "host rejected connection: {}",
                message
            ))),
            HostResponse::Closing => Err(HostError::Closed),
            _ => Ok(()),
        }
    }

    /// Generate the next request ID
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Send a request to the host
    pub fn send(&mut self, request: &HostRequest) -> HostResult<()> {
        let json = serde_json::to_string(request)
            .map_err(|e| HostError::malformed(format!("cannot encode request: {}", e)))?;
        writeln!(self.stream, "{}", json).map_err(|e| self.map_io(e))?;
        self.stream.flush().map_err(|e| self.map_io(e))?;
        log::debug!("Host sent: {:?}", request);
        Ok(())
    }

    /// Receive one response (blocking up to the timeout)
    ///
    /// A line interrupted by a timeout is kept and completed by the next
    /// call.
    pub fn recv(&mut self) -> HostResult<HostResponse> {
        let read = self.reader.read_until(b'\n', &mut self.pending);
        read.map_err(|e| self.map_io(e))?;
        if !self.pending.ends_with(b"\n") {
            self.pending.clear();
            return Err(HostError::Closed);
        }

        let line = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end();
        let response: HostResponse = serde_json::from_str(line)
            .map_err(|e| HostError::malformed(format!("{}: {:?}", e, line)))?;
        log::debug!("Host received: {:?}", response);
        Ok(response)
    }

    /// Send a request and wait for the response carrying its ID
    ///
    /// Responses to earlier requests (left over after a timeout) are
    /// discarded.
    pub fn request(&mut self, request: &HostRequest) -> HostResult<HostResponse> {
        self.send(request)?;
        let Some(id) = request.id() else {
            return self.recv();
        };

        loop {
            let response = self.recv()?;
            match response.id() {
                Some(rid) if rid == id => return Ok(response),
                None => return Err(HostError::Closed),
                Some(stale) => {
                    log::debug!("Discarding stale host response #{} (waiting for #{})", stale, id);
                }
            }
        }
    }

    /// Run a command for its side effects
    pub fn execute(&mut self, command: &str) -> HostResult<()> {
        let id = self.next_id();
        let request = HostRequest::Execute {
            id,
            command: command.to_string(),
        };
        match self.request(&request)? {
            HostResponse::Ok { .. } | HostResponse::Value { .. } => Ok(()),
            HostResponse::Error { message, .. } => Err(HostError::command(message)),
            other => Err(HostError::malformed(format!(
                "unexpected response to '{}': {:?}",
                command, other
            ))),
        }
    }

    /// Run a command and return its value
    pub fn query(&mut self, command: &str) -> HostResult<serde_json::Value> {
        let id = self.next_id();
        let request = HostRequest::Query {
            id,
            command: command.to_string(),
        };
        match self.request(&request)? {
            HostResponse::Value { value, .. } => Ok(value),
            HostResponse::Error { message, .. } => Err(HostError::command(message)),
            other => Err(HostError::malformed(format!(
                "expected a value for '{}', got {:?}",
                command, other
            ))),
        }
    }

    /// Health check
    pub fn ping(&mut self) -> HostResult<bool> {
        let id = self.next_id();
        match self.request(&HostRequest::Ping { id })? {
            HostResponse::Pong { .. } => Ok(true),
            _ => Ok(false),
        }
    }

    /// Ask the host to quit
    pub fn quit(&mut self) -> HostResult<()> {
        self.send(&HostRequest::Quit)
    }

    fn map_io(&self, err: std::io::Error) -> HostError {
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                HostError::Timeout(self.timeout.unwrap_or_default())
            }
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof => {
                HostError::Closed
            }
            _ => HostError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Serve scripted responses on the other end of a socket pair
    fn scripted_host(
        responses: Vec<String>,
    ) -> (HostClient, thread::JoinHandle<Vec<HostRequest>>) {
        let (client_end, host_end) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || {
            let mut reader = BufReader::new(host_end.try_clone().unwrap());
            let mut writer = host_end;
            let mut seen = Vec::new();
            for response in responses {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                seen.push(serde_json::from_str(line.trim_end()).unwrap());
                writeln!(writer, "{}", response).unwrap();
            }
            seen
        });
        let client = HostClient::from_stream(client_end, Some(Duration::from_secs(5))).unwrap();
        (client, handle)
    }

    #[test]
    fn test_query_returns_value() {
        let (mut client, host) =
            scripted_host(vec![r#"{"type":"Value","id":1,"value":["ASN"]}"#.to_string()]);
        let value = client.query("select #1/A:58").unwrap();
        assert_eq!(value, serde_json::json!(["ASN"]));

        let seen = host.join().unwrap();
        assert_eq!(
            seen,
            vec![HostRequest::Query {
                id: 1,
                command: "select #1/A:58".into()
            }]
        );
    }

    #[test]
    fn test_stale_responses_are_skipped() {
        let (mut client, host) = scripted_host(vec![
            r#"{"type":"Ok","id":0}
{"type":"Ok","id":1}"#
                .to_string(),
        ]);
        client.execute("close #1").unwrap();
        host.join().unwrap();
    }

    #[test]
    fn test_host_error_is_command_error() {
        let (mut client, host) = scripted_host(vec![
            r#"{"type":"Error","id":1,"message":"no such file"}"#.to_string(),
        ]);
        let err = client.execute("open 9zzz").unwrap_err();
        assert!(matches!(err, HostError::Command(ref m) if m == "no such file"));
        assert!(!err.is_communication());
        host.join().unwrap();
    }

    #[test]
    fn test_garbage_is_malformed() {
        let (mut client, host) = scripted_host(vec!["not json".to_string()]);
        let err = client.query("distance a b").unwrap_err();
        assert!(matches!(err, HostError::Malformed(_)));
        host.join().unwrap();
    }

    #[test]
    fn test_timeout() {
        let (client_end, _host_end) = UnixStream::pair().unwrap();
        let mut client =
            HostClient::from_stream(client_end, Some(Duration::from_millis(50))).unwrap();
        let err = client.query("measure area sel").unwrap_err();
        assert!(matches!(err, HostError::Timeout(_)));
        assert!(err.is_communication());
    }

    #[test]
    fn test_line_split_by_timeout_is_completed() {
        let (client_end, mut host_end) = UnixStream::pair().unwrap();
        let mut client =
            HostClient::from_stream(client_end, Some(Duration::from_millis(50))).unwrap();

        host_end.write_all(br#"{"type":"Value","id":1,"#).unwrap();
        let err = client.recv().unwrap_err();
        assert!(matches!(err, HostError::Timeout(_)));

        host_end.write_all(b"\"value\":2.5}\n").unwrap();
        match client.recv().unwrap() {
            HostResponse::Value { id, value } => {
                assert_eq!(id, 1);
                assert_eq!(value, serde_json::json!(2.5));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_closed_connection() {
        let (client_end, host_end) = UnixStream::pair().unwrap();
        drop(host_end);
        let mut client = HostClient::from_stream(client_end, Some(Duration::from_secs(1))).unwrap();
        let err = client.ping().unwrap_err();
        assert!(matches!(err, HostError::Closed));
    }
}
