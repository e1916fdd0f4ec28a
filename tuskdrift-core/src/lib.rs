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

//! Context & Span Core.
//!
//! Trace/span identifiers, the active-context derivation tree, the span
//! lifecycle (`start`/`addAttributes`/`end`), and the trace blocking
//! manager. Everything downstream (schema/hasher, export, transport,
//! resolver, transform, drivers) is built on top of the types here.

pub mod attrs;
pub mod blocking;
pub mod context;
pub mod error;
pub mod ids;
pub mod span;

pub use attrs::{AttrKey, AttributeBag, PackageType, SpanKind, SpanStatus};
pub use blocking::TraceBlockingManager;
pub use context::{
    current_context, get_active_span, get_replay_trace_id, get_trace_info, require_active_span,
    with_context, with_context_sync, ContextState, TraceInfo,
};
pub use error::{CoreError, Result};
pub use ids::{IdParseError, SpanId, TraceId};
pub use span::{start_span, RawSpanRecord, SpanInner, SpanRef, StartSpanOptions, TimestampPair};
