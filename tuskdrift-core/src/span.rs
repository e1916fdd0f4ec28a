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

//! Span creation, mutation, and idempotent completion.
//!
//! `startSpan`/`endSpan`/`addAttributes` from spec.md §4.1. A span is a
//! mutable `SpanInner` behind an `Arc` (so drivers and the ambient
//! context can share a handle) guarded by a small state machine so that
//! `end` is a no-op the second time it's called (spec.md §8 idempotence
//! property).

use crate::attrs::{AttrKey, AttributeBag, PackageType, SpanKind, SpanStatus};
use crate::blocking::TraceBlockingManager;
use crate::context::ContextState;
use crate::ids::{SpanId, TraceId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// A timestamp or duration, `{seconds, nanos}` as spec.md §3 requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimestampPair {
    pub seconds: i64,
    pub nanos: u32,
}

impl TimestampPair {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    pub fn from_duration(d: std::time::Duration) -> Self {
        Self {
            seconds: d.as_secs() as i64,
            nanos: d.subsec_nanos(),
        }
    }
}

/// Options passed to [`start_span`].
#[derive(Debug, Clone)]
pub struct StartSpanOptions {
    pub name: String,
    pub package_name: String,
    pub instrumentation_name: String,
    pub submodule_name: Option<String>,
    pub package_type: PackageType,
    pub kind: SpanKind,
    pub is_pre_app_start: bool,
    /// REPLAY: the trace id carried by `x-td-trace-id`, used when there is
    /// no parent span to inherit from (spec.md §3 "Identifiers").
    pub trace_id_override: Option<TraceId>,
}

enum SpanState {
    Active(AttributeBag),
    Ended,
}

pub struct SpanInner {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub package_name: String,
    pub instrumentation_name: String,
    pub submodule_name: Option<String>,
    pub package_type: PackageType,
    pub kind: SpanKind,
    pub is_pre_app_start: bool,
    start_wall: DateTime<Utc>,
    start_instant: Instant,
    state: Mutex<SpanState>,
}

/// Shared handle to a span. Cheaply cloneable (`Arc`); this is what
/// flows through the active context and what drivers hold on to between
/// `start_span` and `end`.
pub type SpanRef = Arc<SpanInner>;

/// The record produced once a span ends: raw attributes plus the
/// finishing timestamp, ready for the (pure, separate) span transformer
/// in `tuskdrift-export` to turn into a `CleanSpan`.
#[derive(Debug, Clone)]
pub struct RawSpanRecord {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub package_name: String,
    pub instrumentation_name: String,
    pub submodule_name: Option<String>,
    pub package_type: PackageType,
    pub kind: SpanKind,
    pub is_pre_app_start: bool,
    pub is_root_span: bool,
    pub attributes: AttributeBag,
    pub status: SpanStatus,
    pub timestamp: TimestampPair,
    pub duration: TimestampPair,
}

/// spec.md §4.1: `startSpan` consults the blocking manager with the
/// parent's trace id; if blocked, returns `Ok(None)` (the sentinel — no
/// span is created, and no error is raised to the RECORD-mode caller).
pub fn start_span(
    opts: StartSpanOptions,
    parent_ctx: &ContextState,
    blocking: &TraceBlockingManager,
) -> Option<SpanRef> {
    let parent_span = parent_ctx.active_span.clone();

    let trace_id = parent_span
        .as_ref()
        .map(|s| s.trace_id)
        .or(opts.trace_id_override)
        .unwrap_or_else(TraceId::generate);

    if blocking.is_blocked(trace_id) {
        tracing::debug!(trace_id = %trace_id, "startSpan suppressed: trace is blocked");
        return None;
    }

    let span = SpanInner {
        trace_id,
        span_id: SpanId::generate(),
        parent_span_id: parent_span.as_ref().map(|s| s.span_id),
        name: opts.name,
        package_name: opts.package_name,
        instrumentation_name: opts.instrumentation_name,
        submodule_name: opts.submodule_name,
        package_type: opts.package_type,
        kind: opts.kind,
        is_pre_app_start: opts.is_pre_app_start,
        start_wall: Utc::now(),
        start_instant: Instant::now(),
        state: Mutex::new(SpanState::Active(AttributeBag::new())),
    };

    Some(Arc::new(span))
}

impl SpanInner {
    /// Merge attributes into the span. No-op (logged) if the span has
    /// already ended.
    pub fn add_attributes(&self, attrs: impl IntoIterator<Item = (AttrKey, String)>) {
        let mut state = self.state.lock();
        match &mut *state {
            SpanState::Active(bag) => {
                for (k, v) in attrs {
                    bag.insert(k, v);
                }
            }
            SpanState::Ended => {
                tracing::warn!(
                    span_id = %self.span_id,
                    "addAttributes called on an already-ended span; ignored"
                );
            }
        }
    }

    /// End the span. Returns `None` the second (and every subsequent)
    /// time it's called — spec.md §8 idempotence.
    pub fn end(&self, status: Option<SpanStatus>) -> Option<RawSpanRecord> {
        let mut state = self.state.lock();
        let bag = match std::mem::replace(&mut *state, SpanState::Ended) {
            SpanState::Active(bag) => bag,
            SpanState::Ended => return None,
        };

        let is_root_span = self.parent_span_id.is_none() || self.kind == SpanKind::Server;
        let elapsed = self.start_instant.elapsed();

        Some(RawSpanRecord {
            trace_id: self.trace_id,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id,
            name: self.name.clone(),
            package_name: self.package_name.clone(),
            instrumentation_name: self.instrumentation_name.clone(),
            submodule_name: self.submodule_name.clone(),
            package_type: self.package_type,
            kind: self.kind,
            is_pre_app_start: self.is_pre_app_start,
            is_root_span,
            attributes: bag,
            status: status.unwrap_or(SpanStatus::Ok),
            timestamp: TimestampPair::from_datetime(self.start_wall),
            duration: TimestampPair::from_duration(elapsed),
        })
    }

    pub fn is_ended(&self) -> bool {
        matches!(&*self.state.lock(), SpanState::Ended)
    }
}
