//! Synchronous mock-request path — spec.md §9 "coroutine/callback
//! plurality": some interception points (Date) need a synchronous
//! result and the async client isn't usable from that call site. Built
//! directly on `std::net`/`std::os::unix::net`, not a netcat subprocess
//! (SPEC_FULL supplement resolving that open question).

use crate::error::{Result, TransportError};
use crate::message::{generate_request_id, TransportMessage};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use tuskdrift_schema::CleanSpan;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

enum BlockingStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl BlockingStream {
    fn set_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            BlockingStream::Tcp(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
            #[cfg(unix)]
            BlockingStream::Unix(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
        }
    }
}

impl Read for BlockingStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            BlockingStream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            BlockingStream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for BlockingStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            BlockingStream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            BlockingStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            BlockingStream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            BlockingStream::Unix(s) => s.flush(),
        }
    }
}

fn read_frame_blocking(stream: &mut BlockingStream) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(TransportError::InvalidFrameLength(len));
    }
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_frame_blocking(stream: &mut BlockingStream, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Err(TransportError::InvalidFrameLength(0));
    }
    stream.write_all(&(payload.len() as u32).to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()?;
    Ok(())
}

/// A single blocking round-trip against an already-established CLI
/// connection. Each call opens its own socket: the sync path is used
/// rarely (date lookups), so paying a fresh connect per call is simpler
/// and safer than sharing a connection with the async client's reader
/// task across a sync/async boundary.
pub struct SyncMockClient {
    timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum SyncConnInfo {
    Unix(std::path::PathBuf),
    Tcp { host: String, port: u16 },
}

impl SyncMockClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn dial(&self, conn_info: &SyncConnInfo) -> Result<BlockingStream> {
        let stream = match conn_info {
            #[cfg(unix)]
            SyncConnInfo::Unix(path) => BlockingStream::Unix(UnixStream::connect(path)?),
            #[cfg(not(unix))]
            SyncConnInfo::Unix(_) => {
                return Err(TransportError::NotReady("unix sockets unsupported on this platform"))
            }
            SyncConnInfo::Tcp { host, port } => {
                BlockingStream::Tcp(TcpStream::connect((host.as_str(), *port))?)
            }
        };
        stream.set_timeout(Some(self.timeout))?;
        Ok(stream)
    }

    pub fn request_mock(
        &self,
        conn_info: &SyncConnInfo,
        outbound_span: CleanSpan,
        test_id: Option<String>,
    ) -> Result<(bool, Option<serde_json::Value>, Option<String>)> {
        let mut stream = self.dial(conn_info)?;
        let request_id = generate_request_id();
        let message = TransportMessage::MockRequest {
            request_id: request_id.clone(),
            test_id,
            outbound_span: Box::new(outbound_span),
            stack_trace: None,
            tags: Vec::new(),
        };
        let payload = bincode::serialize(&message)?;
        write_frame_blocking(&mut stream, &payload)?;

        let response_payload = read_frame_blocking(&mut stream)?;
        let response: TransportMessage = bincode::deserialize(&response_payload)?;
        match response {
            TransportMessage::MockResponse {
                request_id: resp_id,
                found,
                response_data,
                error,
            } if resp_id == request_id => Ok((found, response_data, error)),
            TransportMessage::MockResponse { .. } => Err(TransportError::ConnectionClosed),
            _ => Err(TransportError::ConnectionClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use tuskdrift_core::{PackageType, SpanKind, SpanStatus, TimestampPair};
    use tuskdrift_schema::JsonSchema;

    fn sample_span() -> CleanSpan {
        CleanSpan {
            trace_id: "t".into(),
            span_id: "s".into(),
            parent_span_id: String::new(),
            name: "date-now".into(),
            package_name: "date".into(),
            instrumentation_name: "date".into(),
            submodule_name: None,
            package_type: PackageType::Date,
            kind: SpanKind::Internal,
            input_value: serde_json::Value::Null,
            output_value: serde_json::Value::Null,
            input_schema: JsonSchema::Null,
            output_schema: JsonSchema::Null,
            input_value_hash: "h".into(),
            output_value_hash: "h".into(),
            input_schema_hash: "h".into(),
            output_schema_hash: "h".into(),
            status: SpanStatus::Ok,
            timestamp: TimestampPair { seconds: 0, nanos: 0 },
            duration: TimestampPair { seconds: 0, nanos: 0 },
            is_root_span: true,
            is_pre_app_start: false,
            metadata: None,
            transform_metadata: None,
            is_used: false,
        }
    }

    #[test]
    fn blocking_round_trip_over_tcp_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let payload = read_frame_blocking(&mut BlockingStream::Tcp(conn.try_clone().unwrap())).unwrap();
            let message: TransportMessage = bincode::deserialize(&payload).unwrap();
            let reply = TransportMessage::MockResponse {
                request_id: message.request_id().to_string(),
                found: true,
                response_data: Some(serde_json::json!({"now": "2026-07-28T00:00:00Z"})),
                error: None,
            };
            let reply_payload = bincode::serialize(&reply).unwrap();
            write_frame_blocking(&mut BlockingStream::Tcp(conn), &reply_payload).unwrap();
        });

        let client = SyncMockClient::new(Duration::from_secs(5));
        let conn_info = SyncConnInfo::Tcp { host: "127.0.0.1".into(), port };
        let (found, data, error) = client.request_mock(&conn_info, sample_span(), None).unwrap();

        assert!(found);
        assert_eq!(data, Some(serde_json::json!({"now": "2026-07-28T00:00:00Z"})));
        assert!(error.is_none());
        server.join().unwrap();
    }
}
