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

//! `generateSchemaAndHash` — spec.md §4.2.
//!
//! 1. Normalize (handled by [`crate::value::Value::normalize`] before
//!    this module runs, or a no-op if the caller already has
//!    `serde_json::Value`).
//! 2. Decode-by-merges: base64/JSON-decode top-level keys the caller
//!    flagged via a [`SchemaMerge`].
//! 3. Infer schema from the decoded value.
//! 4. Canonicalize (recursive key sort) both decoded value and schema.
//! 5. SHA-256 hex hash each canonical form.

use crate::canonical::canonicalize;
use crate::schema::{infer_schema, infer_schema_with_merges, DecodedType, Encoding, JsonSchema, SchemaMerges};
use base64::Engine;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct GeneratedSchemaAndHash {
    pub decoded_value: serde_json::Value,
    pub schema: JsonSchema,
    pub decoded_value_hash: String,
    pub decoded_schema_hash: String,
}

/// Decode every top-level key flagged by a merge. Failure to decode (bad
/// base64, or a `decodedType: Json` that doesn't parse) keeps the
/// original value untouched, per spec.md §4.2 step 2.
fn decode_by_merges(value: &serde_json::Value, merges: &SchemaMerges) -> serde_json::Value {
    let serde_json::Value::Object(map) = value else {
        return value.clone();
    };
    let mut out = serde_json::Map::new();
    for (k, v) in map {
        let decoded = match merges.get(k) {
            Some(merge) if merge.encoding == Some(Encoding::Base64) => decode_one(v, merge),
            _ => v.clone(),
        };
        out.insert(k.clone(), decoded);
    }
    serde_json::Value::Object(out)
}

fn decode_one(v: &serde_json::Value, merge: &crate::schema::SchemaMerge) -> serde_json::Value {
    let serde_json::Value::String(s) = v else {
        return v.clone();
    };
    let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(s) else {
        tracing::debug!("schema merge: base64 decode failed, keeping original value");
        return v.clone();
    };

    let should_parse_json = matches!(merge.decoded_type, Some(DecodedType::Json) | None);
    if should_parse_json {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(text) {
                return parsed;
            }
        }
        if merge.decoded_type == Some(DecodedType::Json) {
            // Caller explicitly promised JSON; since it didn't parse, keep
            // the original (still-encoded) value rather than garbage bytes.
            return v.clone();
        }
    }

    match String::from_utf8(bytes) {
        Ok(text) => serde_json::Value::String(text),
        Err(_) => v.clone(),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn hash_json(value: &serde_json::Value) -> String {
    // `serde_json::to_vec` over a `BTreeMap`-backed `Map` is already
    // deterministic, but we hash the *canonical* form explicitly so the
    // invariant holds even if a node forgot to canonicalize upstream.
    let canon = canonicalize(value);
    sha256_hex(&serde_json::to_vec(&canon).expect("canonical JSON always serializes"))
}

/// Full pipeline: normalize is assumed already applied by the caller
/// (callers typically hold a `tuskdrift_schema::Value` and call
/// `.normalize()` first); this function performs steps 2-5.
pub fn generate_schema_and_hash(
    normalized: serde_json::Value,
    merges: Option<&SchemaMerges>,
) -> GeneratedSchemaAndHash {
    let decoded = match merges {
        Some(m) => decode_by_merges(&normalized, m),
        None => normalized,
    };

    let schema = match merges {
        Some(m) => infer_schema_with_merges(&decoded, m),
        None => infer_schema(&decoded),
    };

    let schema_json = serde_json::to_value(&schema).expect("schema always serializes");

    GeneratedSchemaAndHash {
        decoded_value_hash: hash_json(&decoded),
        decoded_schema_hash: hash_json(&schema_json),
        decoded_value: decoded,
        schema,
    }
}
