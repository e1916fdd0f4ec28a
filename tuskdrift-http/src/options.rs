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

//! Driver-facing request shapes — spec.md §6 "Driver-facing API" and
//! §4.9 transform targets, specialized to HTTP (the only in-scope
//! interceptor).

use base64::Engine;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tuskdrift_core::{PackageType, SpanKind};
use tuskdrift_schema::SchemaMerges;
use tuskdrift_transform::Direction;

/// The three modes a driver instance runs in, per spec.md §6's
/// `TUSK_DRIFT_MODE` env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Record,
    Replay,
    Disabled,
}

/// One captured HTTP message (request or response), in the shape the
/// Transform Engine expects (`path`/`url`, `headers`, `body` — base64).
/// Inbound spans use `url` (the full request target); outbound spans
/// use `path` (what the client actually dialed), per spec.md §4.9.
#[derive(Debug, Clone, Default)]
pub struct HttpMessage {
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpMessage {
    pub fn to_value(&self, path_key: &str, path_value: &str) -> Value {
        let mut map = Map::new();
        map.insert(path_key.to_string(), Value::String(path_value.to_string()));

        let mut headers = Map::new();
        for (k, v) in &self.headers {
            headers.insert(k.clone(), Value::String(v.clone()));
        }
        map.insert("headers".to_string(), Value::Object(headers));

        if let Some(body) = &self.body {
            let encoded = base64::engine::general_purpose::STANDARD.encode(body);
            map.insert("body".to_string(), Value::String(encoded));
        }

        Value::Object(map)
    }
}

/// `createAndExecuteSpan`'s `options` parameter (spec.md §6). `bodyValue`
/// here plays the role of spec.md's separate trailing `body` argument —
/// folded in because this reference driver already builds `inputValue`
/// as one structured object per `HttpMessage::to_value`, so there is no
/// separate dynamic payload to thread through.
#[derive(Debug, Clone)]
pub struct SpanOptions {
    pub name: String,
    pub kind: SpanKind,
    pub package_name: String,
    pub package_type: PackageType,
    pub instrumentation_name: String,
    pub submodule_name: Option<String>,
    /// HTTP method, used by the Transform Engine's method matcher
    /// (spec.md §4.9). Kept as a first-class field rather than parsed
    /// back out of `input_value` each time.
    pub method: Option<http::Method>,
    /// Hostname, matched against a rule's `host` pattern.
    pub host: Option<String>,
    pub input_value: Value,
    pub input_schema_merges: Option<SchemaMerges>,
    pub output_value: Option<Value>,
    pub is_pre_app_start: bool,
    pub stop_recording_child_spans: bool,
}

impl SpanOptions {
    /// `direction` as the Transform Engine understands it, derived from
    /// the span kind — inbound requires SERVER, outbound requires
    /// CLIENT (spec.md §4.9).
    pub fn transform_direction(&self) -> Option<Direction> {
        match self.kind {
            SpanKind::Server => Some(Direction::Inbound),
            SpanKind::Client => Some(Direction::Outbound),
            SpanKind::Internal => None,
        }
    }
}
