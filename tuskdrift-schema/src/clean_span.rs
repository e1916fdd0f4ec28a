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

//! `CleanSpan` — the record written to adapters (spec.md §3).
//!
//! Lives in this crate (rather than `tuskdrift-core` or
//! `tuskdrift-export`) because it's the shared currency of three
//! independent subsystems — the batch exporter, the CLI transport wire
//! protocol, and the mock resolver — and all three already depend on
//! `tuskdrift-schema` for `JsonSchema`.

use crate::schema::JsonSchema;
use serde::{Deserialize, Serialize};
use tuskdrift_core::{PackageType, SpanKind, SpanStatus, TimestampPair};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanSpan {
    pub trace_id: String,
    pub span_id: String,
    /// Empty string if this is a root span, per spec.md §3.
    pub parent_span_id: String,

    pub name: String,
    pub package_name: String,
    pub instrumentation_name: String,
    pub submodule_name: Option<String>,
    pub package_type: PackageType,

    pub kind: SpanKind,

    pub input_value: serde_json::Value,
    pub output_value: serde_json::Value,
    pub input_schema: JsonSchema,
    pub output_schema: JsonSchema,

    pub input_value_hash: String,
    pub output_value_hash: String,
    pub input_schema_hash: String,
    pub output_schema_hash: String,

    pub status: SpanStatus,

    pub timestamp: TimestampPair,
    pub duration: TimestampPair,

    pub is_root_span: bool,
    pub is_pre_app_start: bool,

    pub metadata: Option<serde_json::Value>,
    pub transform_metadata: Option<serde_json::Value>,

    /// Mock-matching bookkeeping. Never exported — every adapter/wire
    /// serialization skips it (spec.md §3: "transient isUsed... never
    /// exported").
    #[serde(skip)]
    pub is_used: bool,
}

impl CleanSpan {
    /// Estimate the span's on-the-wire size for the Batch Processor's
    /// size-based trace-blocking check (spec.md §4.5): input + output
    /// JSON length plus a fixed overhead for everything else.
    pub fn estimated_size_bytes(&self) -> usize {
        const OVERHEAD: usize = 50 * 1024;
        let input_len = serde_json::to_vec(&self.input_value).map(|v| v.len()).unwrap_or(0);
        let output_len = serde_json::to_vec(&self.output_value).map(|v| v.len()).unwrap_or(0);
        input_len + output_len + OVERHEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonSchema;

    fn sample() -> CleanSpan {
        CleanSpan {
            trace_id: "t".into(),
            span_id: "s".into(),
            parent_span_id: String::new(),
            name: "n".into(),
            package_name: "pkg".into(),
            instrumentation_name: "instr".into(),
            submodule_name: None,
            package_type: PackageType::Http,
            kind: SpanKind::Server,
            input_value: serde_json::json!({"a": "b"}),
            output_value: serde_json::Value::Null,
            input_schema: JsonSchema::Null,
            output_schema: JsonSchema::Null,
            input_value_hash: "h1".into(),
            output_value_hash: "h2".into(),
            input_schema_hash: "h3".into(),
            output_schema_hash: "h4".into(),
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
    fn is_used_is_never_serialized() {
        let mut span = sample();
        span.is_used = true;
        let json = serde_json::to_string(&span).unwrap();
        assert!(!json.contains("is_used"));
        assert!(!json.contains("isUsed"));
    }

    #[test]
    fn estimated_size_includes_overhead() {
        let span = sample();
        assert!(span.estimated_size_bytes() >= 50 * 1024);
    }
}
