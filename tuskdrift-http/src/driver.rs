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

//! The reference HTTP driver — spec.md §6 "Driver-facing API", wired
//! against every subsystem crate. The driver wraps an arbitrary
//! `original_call` rather than issuing HTTP requests itself, so it
//! deliberately does not depend on reqwest/axum/tower (the teacher's
//! own client/server stack) — a driver must stay framework-agnostic.

use crate::error::{HttpDriverError, Result};
use crate::mock_provider::MockProvider;
use crate::options::{Mode, SpanOptions};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tuskdrift_core::{
    current_context, start_span, AttrKey, ContextState, SpanKind, SpanStatus, StartSpanOptions,
    TraceBlockingManager, TraceId,
};
use tuskdrift_export::{transform_span, BatchProcessor, BatchProcessorConfig, ExportAdapter};
use tuskdrift_schema::{generate_schema_and_hash, sha256_hex, CleanSpan, JsonSchema};
use tuskdrift_transform::{RequestMeta, TransformEngine};
use tuskdrift_transport::TransportClient;

pub struct HttpDriver {
    mode: Mode,
    blocking: Arc<TraceBlockingManager>,
    batch: Arc<BatchProcessor>,
    transform: Arc<TransformEngine>,
    mock_provider: Option<Arc<dyn MockProvider>>,
    transport: Option<Arc<TransportClient>>,
}

impl HttpDriver {
    /// Builds the driver. `adapters` is the full configured set; outside
    /// RECORD mode only adapters with `active_outside_record_mode() ==
    /// true` are kept (spec.md §4.6).
    pub fn new(
        mode: Mode,
        adapters: Vec<Arc<dyn ExportAdapter>>,
        batch_config: BatchProcessorConfig,
        transform: Arc<TransformEngine>,
        mock_provider: Option<Arc<dyn MockProvider>>,
        transport: Option<Arc<TransportClient>>,
    ) -> Arc<Self> {
        let blocking = Arc::new(TraceBlockingManager::new());

        let adapters = if mode == Mode::Record {
            adapters
        } else {
            adapters
                .into_iter()
                .filter(|a| a.active_outside_record_mode())
                .collect()
        };

        let batch = BatchProcessor::new(adapters, blocking.clone(), batch_config);

        Arc::new(Self {
            mode,
            blocking,
            batch,
            transform,
            mock_provider,
            transport,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn blocking_manager(&self) -> &Arc<TraceBlockingManager> {
        &self.blocking
    }

    pub fn spawn_flush_loop(&self) -> tokio::task::JoinHandle<()> {
        self.batch.spawn_flush_loop()
    }

    /// Whole-request `drop` check a driver must run before starting any
    /// span for an inbound request (spec.md §4.9).
    pub fn should_drop_inbound_request(
        &self,
        method: &http::Method,
        host: Option<&str>,
        path: &str,
    ) -> bool {
        let meta = RequestMeta {
            direction: tuskdrift_transform::Direction::Inbound,
            method: Some(method),
            host,
            path,
        };
        self.transform.should_drop_inbound_request(&meta)
    }

    fn request_meta<'a>(options: &'a SpanOptions, path: &'a str) -> Option<RequestMeta<'a>> {
        Some(RequestMeta {
            direction: options.transform_direction()?,
            method: options.method.as_ref(),
            host: options.host.as_deref(),
            path,
        })
    }

    /// spec.md §4.9: "`drop`... when matched on an inbound request
    /// before a span exists, prevents trace creation entirely (the
    /// driver must query `shouldDropInboundRequest` prior to starting a
    /// span)." Only SERVER spans are inbound requests; CLIENT/INTERNAL
    /// spans are never gated here.
    fn should_drop_server_span(&self, options: &SpanOptions, path: &str) -> bool {
        if options.kind != SpanKind::Server {
            return false;
        }
        let meta = RequestMeta {
            direction: tuskdrift_transform::Direction::Inbound,
            method: options.method.as_ref(),
            host: options.host.as_deref(),
            path,
        };
        self.transform.should_drop_inbound_request(&meta)
    }

    fn effective_parent_ctx() -> ContextState {
        current_context().unwrap_or_else(|| ContextState::root(true))
    }

    /// `createAndExecuteSpan(mode, originalCall, options, body)` — spec.md
    /// §6. `body` from the spec signature is folded into
    /// `options.input_value` for this reference driver (see
    /// [`SpanOptions`]'s doc comment).
    pub async fn create_and_execute_span<F, Fut, T, E>(
        self: &Arc<Self>,
        options: SpanOptions,
        replay_trace_id: Option<TraceId>,
        test_id: Option<String>,
        stack_trace: Option<String>,
        tags: Vec<String>,
        original_call: F,
    ) -> Result<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if self.mode == Mode::Disabled {
            return run_original(original_call).await;
        }

        let parent_ctx = Self::effective_parent_ctx();

        // Unsampled flows, and outbound calls with no live server
        // ancestor, run as a pure passthrough (spec.md §6 "parent-span
        // gating"; §9 "sampling decided at SERVER span creation,
        // inherited by children").
        if !parent_ctx.sampled {
            return run_original(original_call).await;
        }
        if options.kind == SpanKind::Client && parent_ctx.active_span.is_none() {
            tracing::debug!("outbound call with no live server ancestor; running as no-op passthrough");
            return run_original(original_call).await;
        }

        match self.mode {
            Mode::Record => {
                self.handle_record_mode(options, parent_ctx, original_call).await
            }
            Mode::Replay => {
                self.handle_replay_mode(
                    options,
                    parent_ctx,
                    replay_trace_id,
                    test_id,
                    stack_trace,
                    tags,
                    original_call,
                )
                .await
            }
            Mode::Disabled => unreachable!("handled above"),
        }
    }

    async fn handle_record_mode<F, Fut, T, E>(
        self: &Arc<Self>,
        options: SpanOptions,
        parent_ctx: ContextState,
        original_call: F,
    ) -> Result<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let path = path_from_value(&options.input_value).unwrap_or_default();

        if self.should_drop_server_span(&options, &path) {
            tracing::debug!(path = %path, "inbound request matched a drop rule; no span created");
            return run_original(original_call).await;
        }

        let start_opts = StartSpanOptions {
            name: options.name.clone(),
            package_name: options.package_name.clone(),
            instrumentation_name: options.instrumentation_name.clone(),
            submodule_name: options.submodule_name.clone(),
            package_type: options.package_type,
            kind: options.kind,
            is_pre_app_start: options.is_pre_app_start,
            trace_id_override: None,
        };

        let Some(span) = start_span(start_opts, &parent_ctx, &self.blocking) else {
            return run_original(original_call).await;
        };

        let meta = Self::request_meta(&options, &path);

        let mut input_value = options.input_value.clone();
        let mut output_value = Value::Null;
        let transform_metadata = meta
            .map(|m| self.transform.apply(&m, &mut input_value, &mut output_value))
            .unwrap_or_default();
        let dropped = input_value.is_null() && !transform_metadata.is_empty();

        set_common_attrs(&span, &options, &input_value, &transform_metadata);

        let result = original_call().await;

        let (status, out) = match &result {
            Ok(value) => (SpanStatus::Ok, serde_json::to_value(value).ok()),
            Err(err) => (SpanStatus::Error { message: Some(err.to_string()) }, None),
        };
        if !dropped {
            if let Some(out) = out {
                span.add_attributes([(AttrKey::OutputValue, out.to_string())]);
            }
        }

        if let Some(raw) = span.end(Some(status)) {
            self.batch.enqueue(raw);
        }

        result.map_err(|e| HttpDriverError::OriginalCall(e.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_replay_mode<F, Fut, T, E>(
        self: &Arc<Self>,
        options: SpanOptions,
        parent_ctx: ContextState,
        replay_trace_id: Option<TraceId>,
        test_id: Option<String>,
        stack_trace: Option<String>,
        tags: Vec<String>,
        original_call: F,
    ) -> Result<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match options.kind {
            SpanKind::Server => {
                // "Absent ⇒ no span created" (spec.md §6) — the request
                // itself must still be served.
                let Some(trace_id) = replay_trace_id.or(parent_ctx.replay_trace_id) else {
                    tracing::debug!("replay request missing x-td-trace-id; no span created");
                    return run_original(original_call).await;
                };
                self.replay_server_span(options, parent_ctx, trace_id, original_call).await
            }
            SpanKind::Client => {
                self.replay_client_span(options, parent_ctx, test_id, stack_trace, tags).await
            }
            SpanKind::Internal => {
                // No mocking concept for internal spans; record them
                // structurally the same way RECORD would, on the already
                // established replay trace.
                self.handle_record_mode(options, parent_ctx, original_call).await
            }
        }
    }

    async fn replay_server_span<F, Fut, T, E>(
        self: &Arc<Self>,
        options: SpanOptions,
        parent_ctx: ContextState,
        trace_id: TraceId,
        original_call: F,
    ) -> Result<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut ctx = parent_ctx;
        ctx.replay_trace_id = Some(trace_id);

        let path = path_from_value(&options.input_value).unwrap_or_default();

        if self.should_drop_server_span(&options, &path) {
            tracing::debug!(path = %path, "inbound replay request matched a drop rule; no span created");
            return run_original(original_call).await;
        }

        let start_opts = StartSpanOptions {
            name: options.name.clone(),
            package_name: options.package_name.clone(),
            instrumentation_name: options.instrumentation_name.clone(),
            submodule_name: options.submodule_name.clone(),
            package_type: options.package_type,
            kind: options.kind,
            is_pre_app_start: options.is_pre_app_start,
            trace_id_override: Some(trace_id),
        };

        // REPLAY: startSpan failure is fatal (spec.md §4.1).
        let span = start_span(start_opts, &ctx, &self.blocking)
            .ok_or_else(|| HttpDriverError::ReplaySpanCreationFailed(trace_id.to_string()))?;

        let meta = Self::request_meta(&options, &path);
        let mut input_value = options.input_value.clone();
        let mut output_value = Value::Null;
        let transform_metadata = meta
            .map(|m| self.transform.apply(&m, &mut input_value, &mut output_value))
            .unwrap_or_default();

        set_common_attrs(&span, &options, &input_value, &transform_metadata);

        let result = original_call().await;
        let (status, out) = match &result {
            Ok(value) => (SpanStatus::Ok, serde_json::to_value(value).ok()),
            Err(err) => (SpanStatus::Error { message: Some(err.to_string()) }, None),
        };
        if let Some(out) = out {
            span.add_attributes([(AttrKey::OutputValue, out.to_string())]);
        }

        if let Some(raw) = span.end(Some(status)) {
            if let Some(clean) = transform_span(raw.clone()) {
                if let Some(transport) = self.transport.clone() {
                    // Best-effort, fire-and-forget (spec.md §5 "may
                    // overtake regular batched exports").
                    tokio::spawn(async move {
                        if let Err(err) = transport.send_inbound_span_for_replay(clean).await {
                            tracing::warn!(error = %err, "failed to send inbound replay span to CLI");
                        }
                    });
                }
            }
            self.batch.enqueue(raw);
        }

        result.map_err(|e| HttpDriverError::OriginalCall(e.to_string()))
    }

    async fn replay_client_span<T>(
        self: &Arc<Self>,
        options: SpanOptions,
        parent_ctx: ContextState,
        test_id: Option<String>,
        stack_trace: Option<String>,
        tags: Vec<String>,
    ) -> Result<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let Some(provider) = self.mock_provider.clone() else {
            return Err(HttpDriverError::MockNotFound);
        };
        let Some(replay_trace_id) = parent_ctx.replay_trace_id else {
            return Err(HttpDriverError::MissingReplayTraceId);
        };

        let start_opts = StartSpanOptions {
            name: options.name.clone(),
            package_name: options.package_name.clone(),
            instrumentation_name: options.instrumentation_name.clone(),
            submodule_name: options.submodule_name.clone(),
            package_type: options.package_type,
            kind: options.kind,
            is_pre_app_start: options.is_pre_app_start,
            trace_id_override: None,
        };
        let span = start_span(start_opts, &parent_ctx, &self.blocking)
            .ok_or_else(|| HttpDriverError::ReplaySpanCreationFailed(replay_trace_id.to_string()))?;

        let path = path_from_value(&options.input_value).unwrap_or_default();
        let meta = Self::request_meta(&options, &path);
        let mut input_value = options.input_value.clone();
        let mut output_value = Value::Null;
        let transform_metadata = meta
            .map(|m| self.transform.apply(&m, &mut input_value, &mut output_value))
            .unwrap_or_default();

        set_common_attrs(&span, &options, &input_value, &transform_metadata);

        let query_span = query_clean_span(&span, &options, &input_value, &transform_metadata);
        let resolved = provider
            .find_mock_response(&query_span, replay_trace_id, test_id, stack_trace, tags)
            .await;

        let (status, response_value) = match &resolved {
            Ok(Some(data)) => (SpanStatus::Ok, Some(data.clone())),
            Ok(None) => (
                SpanStatus::Error { message: Some("mock not found".to_string()) },
                None,
            ),
            Err(err) => (SpanStatus::Error { message: Some(err.to_string()) }, None),
        };
        if let Some(data) = &response_value {
            span.add_attributes([(AttrKey::OutputValue, data.to_string())]);
        }
        if let Some(raw) = span.end(Some(status)) {
            self.batch.enqueue(raw);
        }

        match resolved? {
            Some(data) => serde_json::from_value(data).map_err(HttpDriverError::from),
            None => Err(HttpDriverError::MockNotFound),
        }
    }
}

fn set_common_attrs(
    span: &tuskdrift_core::SpanRef,
    options: &SpanOptions,
    input_value: &Value,
    transform_metadata: &tuskdrift_transform::TransformMetadata,
) {
    let mut attrs: Vec<(AttrKey, String)> = vec![(AttrKey::InputValue, input_value.to_string())];
    if let Some(merges) = &options.input_schema_merges {
        if let Ok(json) = serde_json::to_string(merges) {
            attrs.push((AttrKey::InputSchemaMerges, json));
        }
    }
    if !transform_metadata.is_empty() {
        if let Ok(json) = serde_json::to_string(transform_metadata) {
            attrs.push((AttrKey::TransformMetadata, json));
        }
    }
    span.add_attributes(attrs);
}

fn query_clean_span(
    span: &tuskdrift_core::SpanRef,
    options: &SpanOptions,
    input_value: &Value,
    transform_metadata: &tuskdrift_transform::TransformMetadata,
) -> CleanSpan {
    let generated = generate_schema_and_hash(input_value.clone(), options.input_schema_merges.as_ref());
    let null_hash = sha256_hex(b"null");

    CleanSpan {
        trace_id: span.trace_id.to_string(),
        span_id: span.span_id.to_string(),
        parent_span_id: span.parent_span_id.map(|id| id.to_string()).unwrap_or_default(),
        name: options.name.clone(),
        package_name: options.package_name.clone(),
        instrumentation_name: options.instrumentation_name.clone(),
        submodule_name: options.submodule_name.clone(),
        package_type: options.package_type,
        kind: SpanKind::Client,
        input_value: generated.decoded_value,
        output_value: Value::Null,
        input_schema: generated.schema,
        output_schema: JsonSchema::Null,
        input_value_hash: generated.decoded_value_hash,
        output_value_hash: null_hash.clone(),
        input_schema_hash: generated.decoded_schema_hash,
        output_schema_hash: null_hash,
        status: SpanStatus::Ok,
        timestamp: tuskdrift_core::TimestampPair { seconds: 0, nanos: 0 },
        duration: tuskdrift_core::TimestampPair { seconds: 0, nanos: 0 },
        is_root_span: false,
        is_pre_app_start: options.is_pre_app_start,
        metadata: None,
        transform_metadata: if transform_metadata.is_empty() {
            None
        } else {
            serde_json::to_value(transform_metadata).ok()
        },
        is_used: false,
    }
}

fn path_from_value(value: &Value) -> Option<String> {
    value
        .get("url")
        .or_else(|| value.get("path"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

async fn run_original<F, Fut, T, E>(original_call: F) -> Result<T>
where
    E: fmt::Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    original_call().await.map_err(|e| HttpDriverError::OriginalCall(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_provider::LocalMockStore;
    use base64::Engine;
    use serde_json::json;
    use std::convert::Infallible;
    use tuskdrift_core::with_context;
    use tuskdrift_core::PackageType;
    use tuskdrift_export::adapters::InMemoryAdapter;

    fn base_options(kind: SpanKind) -> SpanOptions {
        SpanOptions {
            name: "GET /users/1".to_string(),
            kind,
            package_name: "http".to_string(),
            package_type: PackageType::Http,
            instrumentation_name: "tuskdrift-http".to_string(),
            submodule_name: None,
            method: Some(http::Method::GET),
            host: Some("api.example.com".to_string()),
            input_value: json!({"url": "/users/1", "headers": {}, "body": null}),
            input_schema_merges: None,
            output_value: None,
            is_pre_app_start: false,
            stop_recording_child_spans: false,
        }
    }

    async fn never_called() -> std::result::Result<serde_json::Value, Infallible> {
        unreachable!("REPLAY must never invoke the original call")
    }

    fn driver(mode: Mode, adapter: Arc<InMemoryAdapter>) -> Arc<HttpDriver> {
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![adapter];
        HttpDriver::new(
            mode,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(TransformEngine::empty()),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn record_mode_exports_a_span() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let drv = driver(Mode::Record, in_memory.clone());

        let result: Result<serde_json::Value> = drv
            .create_and_execute_span(
                base_options(SpanKind::Server),
                None,
                None,
                None,
                Vec::new(),
                || async move { Ok::<_, Infallible>(json!({"ok": true})) },
            )
            .await;

        assert!(result.is_ok());
        drv.batch.flush_once().await;
        assert_eq!(in_memory.len(), 1);
        let spans = in_memory.all();
        assert_eq!(spans[0].instrumentation_name, "tuskdrift-http");
        assert!(spans[0].is_root_span);
    }

    #[tokio::test]
    async fn disabled_mode_is_a_pure_passthrough() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let drv = driver(Mode::Disabled, in_memory.clone());

        let result = drv
            .create_and_execute_span(
                base_options(SpanKind::Server),
                None,
                None,
                None,
                Vec::new(),
                || async move { Ok::<_, Infallible>(json!({"ok": true})) },
            )
            .await
            .unwrap();

        assert_eq!(result, json!({"ok": true}));
        assert_eq!(in_memory.len(), 0);
    }

    #[tokio::test]
    async fn outbound_call_with_no_server_ancestor_is_a_passthrough() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let drv = driver(Mode::Record, in_memory.clone());

        // No ambient context bound: `effective_parent_ctx` falls back to
        // a fresh root, which has no active span, so a CLIENT span
        // cannot be attached to anything and the driver must no-op.
        let result = drv
            .create_and_execute_span(
                base_options(SpanKind::Client),
                None,
                None,
                None,
                Vec::new(),
                || async move { Ok::<_, Infallible>(json!({"ok": true})) },
            )
            .await
            .unwrap();

        assert_eq!(result, json!({"ok": true}));
        assert_eq!(in_memory.len(), 0);
    }

    #[tokio::test]
    async fn replay_mode_resolves_a_recorded_mock() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let store = Arc::new(LocalMockStore::new());
        let trace_id = tuskdrift_core::TraceId::generate();

        let fingerprint_span = tuskdrift_schema::CleanSpan {
            trace_id: trace_id.to_string(),
            span_id: "deadbeefdeadbeef".to_string(),
            parent_span_id: String::new(),
            name: "GET /users/1".to_string(),
            package_name: "http".to_string(),
            instrumentation_name: "tuskdrift-http".to_string(),
            submodule_name: None,
            package_type: PackageType::Http,
            kind: SpanKind::Client,
            input_value: json!({"url": "/users/1", "headers": {}, "body": null}),
            output_value: json!({"id": 1, "name": "Ada"}),
            input_schema: tuskdrift_schema::JsonSchema::Null,
            output_schema: tuskdrift_schema::JsonSchema::Null,
            input_value_hash: tuskdrift_schema::generate_schema_and_hash(
                json!({"url": "/users/1", "headers": {}, "body": null}),
                None,
            )
            .decoded_value_hash,
            output_value_hash: "ignored".to_string(),
            input_schema_hash: "ignored".to_string(),
            output_schema_hash: "ignored".to_string(),
            status: SpanStatus::Ok,
            timestamp: tuskdrift_core::TimestampPair { seconds: 0, nanos: 0 },
            duration: tuskdrift_core::TimestampPair { seconds: 0, nanos: 0 },
            is_root_span: false,
            is_pre_app_start: false,
            metadata: None,
            transform_metadata: None,
            is_used: false,
        };
        store.load_trace(trace_id, vec![fingerprint_span]);

        let drv = HttpDriver::new(
            Mode::Replay,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(TransformEngine::empty()),
            Some(store),
            None,
        );

        let mut ctx = ContextState::root(true);
        ctx.replay_trace_id = Some(trace_id);
        // A CLIENT span must have a live ancestor (normally the inbound
        // server span the request arrived on); fake one up directly.
        let parent_span = start_span(
            StartSpanOptions {
                name: "parent".to_string(),
                package_name: "http".to_string(),
                instrumentation_name: "tuskdrift-http".to_string(),
                submodule_name: None,
                package_type: PackageType::Http,
                kind: SpanKind::Server,
                is_pre_app_start: false,
                trace_id_override: Some(trace_id),
            },
            &ctx,
            drv.blocking_manager(),
        )
        .unwrap();
        let ctx = ctx.derive_for_span(parent_span, SpanKind::Server);

        let result: serde_json::Value = with_context(ctx, async {
            drv.create_and_execute_span(
                base_options(SpanKind::Client),
                None,
                None,
                None,
                Vec::new(),
                never_called,
            )
            .await
            .unwrap()
        })
        .await;

        assert_eq!(result, json!({"id": 1, "name": "Ada"}));
    }

    #[tokio::test]
    async fn replay_mode_missing_mock_is_reported() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory];
        let store = Arc::new(LocalMockStore::new());
        let trace_id = tuskdrift_core::TraceId::generate();

        let drv = HttpDriver::new(
            Mode::Replay,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(TransformEngine::empty()),
            Some(store),
            None,
        );

        let mut ctx = ContextState::root(true);
        ctx.replay_trace_id = Some(trace_id);
        let parent_span = start_span(
            StartSpanOptions {
                name: "parent".to_string(),
                package_name: "http".to_string(),
                instrumentation_name: "tuskdrift-http".to_string(),
                submodule_name: None,
                package_type: PackageType::Http,
                kind: SpanKind::Server,
                is_pre_app_start: false,
                trace_id_override: Some(trace_id),
            },
            &ctx,
            drv.blocking_manager(),
        )
        .unwrap();
        let ctx = ctx.derive_for_span(parent_span, SpanKind::Server);

        let result: Result<serde_json::Value> = with_context(ctx, async {
            drv.create_and_execute_span(
                base_options(SpanKind::Client),
                None,
                None,
                None,
                Vec::new(),
                never_called,
            )
            .await
        })
        .await;

        assert!(matches!(result, Err(HttpDriverError::MockNotFound)));
    }

    #[tokio::test]
    async fn unsampled_context_is_a_passthrough() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let drv = driver(Mode::Record, in_memory.clone());

        let ctx = ContextState::root(false);
        let result = with_context(ctx, async {
            drv.create_and_execute_span(
                base_options(SpanKind::Server),
                None,
                None,
                None,
                Vec::new(),
                || async move { Ok::<_, Infallible>(json!({"ok": true})) },
            )
            .await
            .unwrap()
        })
        .await;

        assert_eq!(result, json!({"ok": true}));
        assert_eq!(in_memory.len(), 0);
    }

    #[tokio::test]
    async fn should_drop_inbound_request_gates_before_span_creation() {
        let rules = vec![tuskdrift_transform::RuleConfig {
            direction: tuskdrift_transform::Direction::Inbound,
            method: vec!["GET".to_string()],
            path_pattern: Some("^/health$".to_string()),
            host: None,
            target: None,
            action: tuskdrift_transform::ActionConfig::Drop,
        }];
        let engine = TransformEngine::compile(&rules).unwrap();

        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let drv = HttpDriver::new(
            Mode::Record,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(engine),
            None,
            None,
        );

        assert!(drv.should_drop_inbound_request(&http::Method::GET, None, "/health"));
        assert!(!drv.should_drop_inbound_request(&http::Method::GET, None, "/users/1"));
    }

    #[tokio::test]
    async fn record_mode_drop_rule_prevents_span_creation() {
        let rules = vec![tuskdrift_transform::RuleConfig {
            direction: tuskdrift_transform::Direction::Inbound,
            method: vec!["GET".to_string()],
            path_pattern: Some("^/users/1$".to_string()),
            host: None,
            target: None,
            action: tuskdrift_transform::ActionConfig::Drop,
        }];
        let engine = TransformEngine::compile(&rules).unwrap();

        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let drv = HttpDriver::new(
            Mode::Record,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(engine),
            None,
            None,
        );

        let result = drv
            .create_and_execute_span(
                base_options(SpanKind::Server),
                None,
                None,
                None,
                Vec::new(),
                || async move { Ok::<_, Infallible>(json!({"ok": true})) },
            )
            .await
            .unwrap();

        // Original call still runs; no span is created and nothing is
        // handed to an adapter.
        assert_eq!(result, json!({"ok": true}));
        drv.batch.flush_once().await;
        assert_eq!(in_memory.len(), 0);
    }

    #[tokio::test]
    async fn replay_mode_drop_rule_prevents_span_creation() {
        let rules = vec![tuskdrift_transform::RuleConfig {
            direction: tuskdrift_transform::Direction::Inbound,
            method: vec!["GET".to_string()],
            path_pattern: Some("^/users/1$".to_string()),
            host: None,
            target: None,
            action: tuskdrift_transform::ActionConfig::Drop,
        }];
        let engine = TransformEngine::compile(&rules).unwrap();

        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let store = Arc::new(LocalMockStore::new());
        let trace_id = tuskdrift_core::TraceId::generate();

        let drv = HttpDriver::new(
            Mode::Replay,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(engine),
            Some(store),
            None,
        );

        let mut ctx = ContextState::root(true);
        ctx.replay_trace_id = Some(trace_id);

        let result = with_context(ctx, async {
            drv.create_and_execute_span(
                base_options(SpanKind::Server),
                Some(trace_id),
                None,
                None,
                Vec::new(),
                || async move { Ok::<_, Infallible>(json!({"ok": true})) },
            )
            .await
            .unwrap()
        })
        .await;

        // Dropped before `startSpan`, so there is no fingerprint lookup
        // and no `ReplaySpanCreationFailed`/`MockNotFound` error.
        assert_eq!(result, json!({"ok": true}));
        drv.batch.flush_once().await;
        assert_eq!(in_memory.len(), 0);
    }

    #[tokio::test]
    async fn record_mode_redacts_a_matched_json_path_field() {
        let rules = vec![tuskdrift_transform::RuleConfig {
            direction: tuskdrift_transform::Direction::Inbound,
            method: vec![],
            path_pattern: None,
            host: None,
            target: Some(tuskdrift_transform::RuleTarget::JsonPath(
                "$.body.ssn".to_string(),
            )),
            action: tuskdrift_transform::ActionConfig::Redact { hash_prefix: None },
        }];
        let engine = TransformEngine::compile(&rules).unwrap();

        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let drv = HttpDriver::new(
            Mode::Record,
            adapters,
            tuskdrift_export::BatchProcessorConfig::default(),
            Arc::new(engine),
            None,
            None,
        );

        let mut options = base_options(SpanKind::Server);
        let body = base64::engine::general_purpose::STANDARD.encode(br#"{"ssn":"123-45-6789"}"#);
        options.input_value = json!({"url": "/signup", "headers": {}, "body": body});

        drv.create_and_execute_span::<_, _, serde_json::Value, Infallible>(
            options,
            None,
            None,
            None,
            Vec::new(),
            || async move { Ok(json!({"ok": true})) },
        )
        .await
        .unwrap();

        drv.batch.flush_once().await;
        let spans = in_memory.all();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].transform_metadata.is_some());
        let input_body = spans[0].input_value.get("body").unwrap().as_str().unwrap();
        assert!(!input_body.contains("123-45-6789"));
    }
}

