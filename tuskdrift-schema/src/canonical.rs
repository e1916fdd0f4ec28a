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

//! Canonicalization: spec.md §4.2 step 4, "sort object keys recursively."
//!
//! `serde_json`'s default `Map` is already `BTreeMap`-backed (we never
//! enable the `preserve_order` feature anywhere in this workspace), so
//! key order is already deterministic. This pass exists anyway so the
//! canonicalization step named in the spec is an explicit, auditable
//! function rather than an accident of a dependency's default feature
//! flags — and so hashing stays correct even if some future crate in
//! this workspace turns `preserve_order` on for an unrelated reason.

use serde_json::Value;

pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_nested_object_keys() {
        let input = json!({"b": 1, "a": {"z": 1, "y": 2}});
        let canon = canonicalize(&input);
        let s = serde_json::to_string(&canon).unwrap();
        assert_eq!(s, r#"{"a":{"y":2,"z":1},"b":1}"#);
    }

    #[test]
    fn preserves_array_order() {
        let input = json!([3, 1, 2]);
        assert_eq!(canonicalize(&input), input);
    }

    #[test]
    fn key_order_does_not_affect_canonical_output() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(
            serde_json::to_string(&canonicalize(&a)).unwrap(),
            serde_json::to_string(&canonicalize(&b)).unwrap()
        );
    }
}
