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

//! Tagged-value union for driver-supplied input/output data.
//!
//! spec.md §9 ("Dynamic value inspection → tagged variants"): the
//! original schema inferrer consumes runtime-tagged values. In a
//! statically typed reimplementation we adopt this union so a driver
//! written in Rust can hand over strongly typed data (including binary
//! blobs and real `DateTime`s) without round-tripping through
//! `serde_json::Value` itself first.
//!
//! [`Value::normalize`] performs spec.md §4.2 step 1 ("Normalize: JSON
//! round-trip to drop undefined and normalize numeric/string forms")
//! plus the date-to-ISO-8601 and binary-to-string conversions §4.2
//! calls for.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Distinct from `Null` until normalization drops it (spec.md §3:
    /// "JSON round-trip normalization (drops undefineds)").
    Undefined,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Binary payload; normalizes to a base64 `String` (spec.md §4.2:
    /// "Binary types map to STRING").
    Binary(Vec<u8>),
    /// Normalizes to its RFC 3339 / ISO-8601 string form.
    Date(chrono::DateTime<chrono::Utc>),
    Object(BTreeMap<String, Value>),
    OrderedList(Vec<Value>),
    UnorderedList(Vec<Value>),
}

impl Value {
    /// Step 1 of §4.2: normalize into a plain `serde_json::Value`,
    /// dropping `Undefined`s and converting binaries/dates to strings.
    pub fn normalize(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Undefined => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(bytes) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Value::Date(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    // Undefined object values are dropped entirely, not
                    // kept as JSON null, matching "drops undefineds".
                    if matches!(v, Value::Undefined) {
                        continue;
                    }
                    out.insert(k.clone(), v.normalize());
                }
                serde_json::Value::Object(out)
            }
            Value::OrderedList(items) | Value::UnorderedList(items) => {
                serde_json::Value::Array(items.iter().map(Value::normalize).collect())
            }
        }
    }

    /// True if this value came from an array that should be treated as
    /// order-insensitive for schema purposes (driver-supplied hint; plain
    /// JSON decoding always yields `OrderedList`, since JSON arrays are
    /// ordered by definition).
    pub fn is_unordered_list(&self) -> bool {
        matches!(self, Value::UnorderedList(_))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::OrderedList(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
