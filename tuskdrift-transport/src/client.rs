//! CLI transport client — connect/request-mock/send-inbound-span state
//! machine (spec.md §4.7), grounded on `StdioTransport`'s framing plus
//! `agentreplay-core/src/resilience/mod.rs::CircuitBreaker`'s
//! state-behind-a-lock shape for the connection state machine.

use crate::error::{Result, TransportError};
use crate::framing::{read_message, write_message};
use crate::message::{generate_request_id, TransportMessage};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::{oneshot, Mutex};
use tuskdrift_schema::CleanSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Init,
    Connecting,
    AwaitingAck,
    Ready,
    Closed,
}

impl ConnectionState {
    fn name(self) -> &'static str {
        match self {
            ConnectionState::Init => "INIT",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::AwaitingAck => "AWAITING_ACK",
            ConnectionState::Ready => "READY",
            ConnectionState::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConnInfo {
    Unix(std::path::PathBuf),
    Tcp { host: String, port: u16 },
}

/// A duplex byte stream, erased over TCP/Unix so the client doesn't need
/// to be generic over the transport.
pub trait AsyncDuplex: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncDuplex for T {}

enum PendingSlot {
    Connect(oneshot::Sender<Result<()>>),
    Mock(oneshot::Sender<TransportMessage>),
}

/// One long-lived duplex socket to the CLI (spec.md §5: "one CLI
/// transport" singleton).
pub struct TransportClient {
    state: RwLock<ConnectionState>,
    writer: Mutex<Option<WriteHalf<Box<dyn AsyncDuplex>>>>,
    pending: Arc<DashMap<String, PendingSlot>>,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TransportClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(ConnectionState::Init),
            writer: Mutex::new(None),
            pending: Arc::new(DashMap::new()),
            reader_task: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    async fn dial(conn_info: &ConnInfo) -> Result<Box<dyn AsyncDuplex>> {
        match conn_info {
            ConnInfo::Unix(path) => {
                let stream = UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            ConnInfo::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                Ok(Box::new(stream))
            }
        }
    }

    /// Connects, sends `SdkConnect`, and waits for `ConnectResponse`.
    /// Bounded by `timeout` (spec.md §5: "CLI connect: bounded by a
    /// configurable timeout; failure is fatal in REPLAY, degraded to
    /// DISABLED in RECORD" — the fatal/degrade decision is the caller's,
    /// this just surfaces the error).
    pub async fn connect(
        self: &Arc<Self>,
        conn_info: ConnInfo,
        service_id: String,
        sdk_version: String,
        min_cli_version: String,
        timeout: Duration,
    ) -> Result<()> {
        *self.state.write() = ConnectionState::Connecting;

        let stream = tokio::time::timeout(timeout, Self::dial(&conn_info))
            .await
            .map_err(|_| TransportError::ConnectTimeout)??;

        self.connect_stream(stream, service_id, sdk_version, min_cli_version, timeout)
            .await
    }

    /// Handshake over an already-open duplex stream. Split out of
    /// `connect` so tests can exercise the state machine over an
    /// in-memory pipe instead of a real socket.
    async fn connect_stream(
        self: &Arc<Self>,
        stream: Box<dyn AsyncDuplex>,
        service_id: String,
        sdk_version: String,
        min_cli_version: String,
        timeout: Duration,
    ) -> Result<()> {
        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(write_half);

        let pending = self.pending.clone();
        let state_for_reader = self.clone();
        let handle = tokio::spawn(async move {
            state_for_reader.reader_loop(read_half, pending).await;
        });
        *self.reader_task.lock().await = Some(handle);

        *self.state.write() = ConnectionState::AwaitingAck;

        let request_id = "connect".to_string();
        let (tx, rx) = oneshot::channel();
        self.pending
            .insert(request_id.clone(), PendingSlot::Connect(tx));

        let message = TransportMessage::SdkConnect {
            request_id: request_id.clone(),
            service_id,
            sdk_version,
            min_cli_version,
        };
        self.send_raw(&message).await?;

        let ack = tokio::time::timeout(timeout, rx)
            .await
            .map_err(|_| TransportError::ConnectTimeout)?
            .map_err(|_| TransportError::ConnectionClosed)?;
        ack?;

        *self.state.write() = ConnectionState::Ready;
        Ok(())
    }

    async fn send_raw(&self, message: &TransportMessage) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotReady("INIT"))?;
        write_message(writer, message).await
    }

    async fn reader_loop(
        self: Arc<Self>,
        mut reader: ReadHalf<Box<dyn AsyncDuplex>>,
        pending: Arc<DashMap<String, PendingSlot>>,
    ) {
        loop {
            match read_message(&mut reader).await {
                Ok(message) => self.dispatch_incoming(&pending, message),
                Err(err) => {
                    tracing::warn!(error = %err, "transport reader closed");
                    break;
                }
            }
        }
        self.close(&pending);
    }

    fn dispatch_incoming(&self, pending: &DashMap<String, PendingSlot>, message: TransportMessage) {
        match &message {
            TransportMessage::ConnectResponse {
                request_id,
                success,
                error,
            } => {
                if let Some((_, slot)) = pending.remove(request_id) {
                    if let PendingSlot::Connect(tx) = slot {
                        let result = if *success {
                            Ok(())
                        } else {
                            Err(TransportError::ConnectRejected(
                                error.clone().unwrap_or_default(),
                            ))
                        };
                        let _ = tx.send(result);
                    }
                }
            }
            TransportMessage::MockResponse { request_id, .. } => {
                if let Some((_, slot)) = pending.remove(request_id) {
                    if let PendingSlot::Mock(tx) = slot {
                        let _ = tx.send(message);
                    }
                }
            }
            other => {
                tracing::debug!(request_id = %other.request_id(), "ignoring unexpected inbound message");
            }
        }
    }

    fn close(&self, pending: &DashMap<String, PendingSlot>) {
        *self.state.write() = ConnectionState::Closed;
        // Dropping each sender without a response wakes any awaiter with
        // a `RecvError`, which `request_mock`/`connect` map to
        // `ConnectionClosed`.
        pending.clear();
    }

    /// Sends a `MockRequest` and awaits the matching `MockResponse`.
    pub async fn request_mock(
        &self,
        outbound_span: CleanSpan,
        test_id: Option<String>,
        stack_trace: Option<String>,
        tags: Vec<String>,
    ) -> Result<(bool, Option<serde_json::Value>, Option<String>)> {
        if self.state() != ConnectionState::Ready {
            return Err(TransportError::NotReady(self.state().name()));
        }

        let request_id = generate_request_id();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id.clone(), PendingSlot::Mock(tx));

        let message = TransportMessage::MockRequest {
            request_id: request_id.clone(),
            test_id,
            outbound_span: Box::new(outbound_span),
            stack_trace,
            tags,
        };

        if let Err(err) = self.send_raw(&message).await {
            self.pending.remove(&request_id);
            return Err(err);
        }

        match rx.await {
            Ok(TransportMessage::MockResponse {
                found,
                response_data,
                error,
                ..
            }) => Ok((found, response_data, error)),
            Ok(_) => unreachable!("dispatch_incoming only resolves Mock slots with MockResponse"),
            Err(_) => Err(TransportError::ConnectionClosed),
        }
    }

    /// Fire-and-forget inbound-replay-span emission; no correlation, no
    /// waiting for a reply (spec.md §4.7).
    pub async fn send_inbound_span_for_replay(&self, span: CleanSpan) -> Result<()> {
        let message = TransportMessage::InboundSpan {
            request_id: generate_request_id(),
            span: Box::new(span),
        };
        self.send_raw(&message).await
    }

    /// Cancels an outstanding mock request; any later response for this
    /// request id is dropped silently.
    pub fn cancel_mock_request(&self, request_id: &str) {
        self.pending.remove(request_id);
    }
}
