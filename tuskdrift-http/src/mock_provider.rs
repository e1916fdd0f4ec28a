// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `findMockResponse` (spec.md §6), behind a trait so the driver can run
//! against a real CLI transport or an in-process fixture store (useful
//! for tests and for a standalone REPLAY harness that doesn't need a
//! separate CLI process). Grounded on `tuskdrift-resolver`'s pure
//! matching function either way.

use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tuskdrift_core::TraceId;
use tuskdrift_resolver::{resolve_mock, Fingerprint};
use tuskdrift_schema::CleanSpan;
use tuskdrift_transport::TransportClient;

#[async_trait]
pub trait MockProvider: Send + Sync {
    /// Resolve a mock for `outbound_span` within trace `replay_trace_id`.
    /// `Ok(None)` is a clean miss (`MockNotFound` is the driver's call,
    /// not the provider's); `Err` carries transport-level failure.
    async fn find_mock_response(
        &self,
        outbound_span: &CleanSpan,
        replay_trace_id: TraceId,
        test_id: Option<String>,
        stack_trace: Option<String>,
        tags: Vec<String>,
    ) -> Result<Option<serde_json::Value>>;
}

/// Resolves mocks by asking the CLI over the framed transport (the
/// production path — spec.md §6 "In REPLAY: findMockResponse").
pub struct TransportMockProvider {
    client: Arc<TransportClient>,
}

impl TransportMockProvider {
    pub fn new(client: Arc<TransportClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MockProvider for TransportMockProvider {
    async fn find_mock_response(
        &self,
        outbound_span: &CleanSpan,
        _replay_trace_id: TraceId,
        test_id: Option<String>,
        stack_trace: Option<String>,
        tags: Vec<String>,
    ) -> Result<Option<serde_json::Value>> {
        let (found, response_data, error) = self
            .client
            .request_mock(outbound_span.clone(), test_id, stack_trace, tags)
            .await?;

        if let Some(error) = error {
            tracing::warn!(error = %error, "CLI reported an error resolving mock");
        }
        Ok(if found { response_data } else { None })
    }
}

/// Resolves mocks directly against an in-process store of recorded
/// spans, using the same six-tier priority match the CLI would apply.
/// No CLI process required — useful for tests and for embedding a
/// self-contained REPLAY harness.
#[derive(Default)]
pub struct LocalMockStore {
    traces: DashMap<TraceId, Mutex<Vec<CleanSpan>>>,
}

impl LocalMockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed recorded spans for a trace (e.g. loaded from a filesystem
    /// adapter's `.jsonl` fixture).
    pub fn load_trace(&self, trace_id: TraceId, spans: Vec<CleanSpan>) {
        self.traces.insert(trace_id, Mutex::new(spans));
    }
}

#[async_trait]
impl MockProvider for LocalMockStore {
    async fn find_mock_response(
        &self,
        outbound_span: &CleanSpan,
        replay_trace_id: TraceId,
        _test_id: Option<String>,
        _stack_trace: Option<String>,
        _tags: Vec<String>,
    ) -> Result<Option<serde_json::Value>> {
        let Some(candidates) = self.traces.get(&replay_trace_id) else {
            return Ok(None);
        };
        let mut candidates = candidates.lock();
        let fingerprint = Fingerprint::from_span(outbound_span);
        let resolved = resolve_mock(&mut candidates, &fingerprint);
        Ok(resolved.map(|r| candidates[r.index].output_value.clone()))
    }
}
