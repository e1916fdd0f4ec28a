//! Wire messages exchanged with the CLI — spec.md §4.7/§6.
//!
//! Five variants in a closed set, each carrying an opaque `requestId` for
//! correlation. Encoded with `bincode` rather than JSON because the
//! wire format is internal to this SDK/CLI pair, not a public API.

use serde::{Deserialize, Serialize};
use tuskdrift_schema::CleanSpan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransportMessage {
    /// SDK → CLI, sent once per connection before anything else.
    SdkConnect {
        request_id: String,
        service_id: String,
        sdk_version: String,
        min_cli_version: String,
    },
    /// CLI → SDK, reply to `SdkConnect`.
    ConnectResponse {
        request_id: String,
        success: bool,
        error: Option<String>,
    },
    /// SDK → CLI, a request for a previously recorded mock.
    MockRequest {
        request_id: String,
        test_id: Option<String>,
        outbound_span: Box<CleanSpan>,
        stack_trace: Option<String>,
        tags: Vec<String>,
    },
    /// CLI → SDK, reply to `MockRequest`.
    MockResponse {
        request_id: String,
        found: bool,
        response_data: Option<serde_json::Value>,
        error: Option<String>,
    },
    /// SDK → CLI, fire-and-forget; no reply is expected.
    InboundSpan {
        request_id: String,
        span: Box<CleanSpan>,
    },
}

impl TransportMessage {
    pub fn request_id(&self) -> &str {
        match self {
            TransportMessage::SdkConnect { request_id, .. }
            | TransportMessage::ConnectResponse { request_id, .. }
            | TransportMessage::MockRequest { request_id, .. }
            | TransportMessage::MockResponse { request_id, .. }
            | TransportMessage::InboundSpan { request_id, .. } => request_id,
        }
    }
}

/// Generates opaque correlation ids. Not a `TraceId`/`SpanId` — this is
/// purely a transport-level correlation token.
pub fn generate_request_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
