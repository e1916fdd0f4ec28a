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

//! Process-wide, logically immutable context.
//!
//! A derivation creates a new [`ContextState`] that shadows the parent;
//! scoping is implemented with `tokio::task_local!`, which gives us
//! exactly the semantics spec.md §3 asks for — the previous context is
//! restored when the scope ends, and mutation of a *bound* context is
//! impossible because `ContextState` is plain data, not a handle.
//!
//! Concurrency model: each logical task carries its own context value;
//! there is no global mutable map to race on.

use crate::error::{CoreError, Result};
use crate::ids::TraceId;
use crate::span::SpanRef;
use crate::attrs::SpanKind;
use std::future::Future;

/// The required context keys from spec.md §3.
#[derive(Debug, Clone, Default)]
pub struct ContextState {
    pub active_span: Option<SpanRef>,
    pub span_kind: Option<SpanKind>,
    pub is_pre_app_start: bool,
    pub replay_trace_id: Option<TraceId>,
    pub calling_library: Option<String>,
    pub stop_recording_child_spans: bool,
    /// Decided once at SERVER span creation (spec.md §9 open question);
    /// CLIENT/INTERNAL children inherit it unchanged.
    pub sampled: bool,
}

impl ContextState {
    pub fn root(sampled: bool) -> Self {
        Self {
            sampled,
            ..Default::default()
        }
    }

    /// Derive a child context that shadows `self`, overriding the active
    /// span and kind. Everything else (replay trace id, calling library,
    /// sampled bit, stop-recording bit) is inherited verbatim.
    pub fn derive_for_span(&self, span: SpanRef, kind: SpanKind) -> Self {
        Self {
            active_span: Some(span),
            span_kind: Some(kind),
            is_pre_app_start: self.is_pre_app_start,
            replay_trace_id: self.replay_trace_id,
            calling_library: self.calling_library.clone(),
            stop_recording_child_spans: self.stop_recording_child_spans,
            sampled: self.sampled,
        }
    }
}

tokio::task_local! {
    static ACTIVE_CONTEXT: ContextState;
}

/// Run `fut` with `ctx` as the active context for its task. When `fut`
/// completes, the previous context (if any) is restored automatically —
/// this is exactly the "derivation" semantics of spec.md §3.
pub async fn with_context<F, T>(ctx: ContextState, fut: F) -> T
where
    F: Future<Output = T>,
{
    ACTIVE_CONTEXT.scope(ctx, fut).await
}

/// Synchronous variant for non-async driver call sites (spec.md §4.1
/// `withSpan(spanHandle, fn)`).
pub fn with_context_sync<F, T>(ctx: ContextState, f: F) -> T
where
    F: FnOnce() -> T,
{
    ACTIVE_CONTEXT.sync_scope(ctx, f)
}

/// Read the currently active span, if any.
pub fn get_active_span() -> Option<SpanRef> {
    ACTIVE_CONTEXT
        .try_with(|c| c.active_span.clone())
        .unwrap_or(None)
}

/// Read the replay trace id from the active context, if set.
pub fn get_replay_trace_id() -> Option<TraceId> {
    ACTIVE_CONTEXT
        .try_with(|c| c.replay_trace_id)
        .unwrap_or(None)
}

/// Clone the currently active context, or `None` if this task has never
/// entered one (i.e. we're outside any span derivation).
pub fn current_context() -> Option<ContextState> {
    ACTIVE_CONTEXT.try_with(|c| c.clone()).ok()
}

/// Equivalent of spec.md §4.1 `getTraceInfo()`, meant for log enrichment.
#[derive(Debug, Clone, Default)]
pub struct TraceInfo {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

pub fn get_trace_info() -> TraceInfo {
    match get_active_span() {
        Some(span) => TraceInfo {
            trace_id: Some(span.trace_id.to_string()),
            span_id: Some(span.span_id.to_string()),
        },
        None => TraceInfo::default(),
    }
}

/// Returns an error for call sites that require an active context to
/// proceed (used by drivers that cannot sensibly no-op without one).
pub fn require_active_span() -> Result<SpanRef> {
    get_active_span().ok_or(CoreError::NoActiveContext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::TraceBlockingManager;
    use crate::attrs::PackageType;
    use crate::span::{start_span, SpanRef, StartSpanOptions};

    fn dummy_span_ref() -> SpanRef {
        let blocking = TraceBlockingManager::new();
        let ctx = ContextState::default();
        start_span(
            StartSpanOptions {
                name: "span".into(),
                package_name: "pkg".into(),
                instrumentation_name: "instr".into(),
                submodule_name: None,
                package_type: PackageType::Http,
                kind: SpanKind::Internal,
                is_pre_app_start: false,
                trace_id_override: None,
            },
            &ctx,
            &blocking,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn derivation_is_restored_after_scope() {
        assert!(get_active_span().is_none());

        let root = ContextState::root(true);
        let span = dummy_span_ref();
        let child = root.derive_for_span(span.clone(), SpanKind::Server);

        with_context(child, async {
            assert_eq!(get_active_span().unwrap().span_id, span.span_id);
        })
        .await;

        // Outside the scope, there's no active context again.
        assert!(get_active_span().is_none());
    }

    #[tokio::test]
    async fn nested_derivation_shadows_then_restores_parent() {
        let root = ContextState::root(true);
        let parent_span = dummy_span_ref();
        let parent_ctx = root.derive_for_span(parent_span.clone(), SpanKind::Server);

        with_context(parent_ctx, async {
            assert_eq!(get_active_span().unwrap().span_id, parent_span.span_id);

            let child_span = dummy_span_ref();
            let outer = current_context().unwrap();
            let child_ctx = outer.derive_for_span(child_span.clone(), SpanKind::Client);

            with_context(child_ctx, async {
                assert_eq!(get_active_span().unwrap().span_id, child_span.span_id);
            })
            .await;

            // Back to the parent's span after the child scope ends.
            assert_eq!(get_active_span().unwrap().span_id, parent_span.span_id);
        })
        .await;
    }

    #[test]
    fn sync_scope_round_trips() {
        let root = ContextState::root(false);
        let span = dummy_span_ref();
        let ctx = root.derive_for_span(span.clone(), SpanKind::Internal);
        with_context_sync(ctx, || {
            assert_eq!(get_active_span().unwrap().span_id, span.span_id);
        });
        assert!(get_active_span().is_none());
    }
}
