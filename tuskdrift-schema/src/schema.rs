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

//! `JsonSchema`: the recursive schema variant from spec.md §3, plus
//! inference from a normalized `serde_json::Value` and the per-key
//! "schema merge" hints (encoding/decodedType/matchImportance).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A schema merge hint, supplied by the caller per top-level key of the
/// value being captured (spec.md §4.2 step 2-3; glossary "Schema
/// merge").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaMerge {
    pub encoding: Option<Encoding>,
    pub decoded_type: Option<DecodedType>,
    pub match_importance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Base64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedType {
    Json,
    Html,
}

pub type SchemaMerges = BTreeMap<String, SchemaMerge>;

/// Recursive JSON schema, per spec.md §3. Merges (spec.md §4.2 step 2-3)
/// only ever apply to a *top-level* key of an object, so only
/// `Object`'s property values carry the optional merge annotation —
/// nested schema nodes below that are plain `JsonSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JsonSchema {
    Number,
    String,
    Boolean,
    Null,
    Undefined,
    Function,
    Object {
        properties: BTreeMap<String, JsonSchemaWithMerge>,
    },
    OrderedList {
        items: Option<Box<JsonSchema>>,
    },
    UnorderedList {
        items: Option<Box<JsonSchema>>,
    },
}

/// A schema node annotated with its optional merge fields. This is the
/// shape actually embedded in a `CleanSpan`'s `inputSchema`/
/// `outputSchema` object properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaWithMerge {
    pub schema: JsonSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_type: Option<DecodedType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_importance: Option<f64>,
}

impl From<JsonSchema> for JsonSchemaWithMerge {
    fn from(schema: JsonSchema) -> Self {
        Self {
            schema,
            encoding: None,
            decoded_type: None,
            match_importance: None,
        }
    }
}

/// Infer a schema from a (decoded, normalized) JSON value, with no
/// merge annotation — used recursively for nested values and for
/// top-level values that aren't an object (merges only key off object
/// properties).
pub fn infer_schema(value: &serde_json::Value) -> JsonSchema {
    match value {
        serde_json::Value::Null => JsonSchema::Null,
        serde_json::Value::Bool(_) => JsonSchema::Boolean,
        serde_json::Value::Number(_) => JsonSchema::Number,
        serde_json::Value::String(_) => JsonSchema::String,
        serde_json::Value::Array(items) => JsonSchema::OrderedList {
            items: items.first().map(|v| Box::new(infer_schema(v))),
        },
        serde_json::Value::Object(map) => {
            let properties = map
                .iter()
                .map(|(k, v)| (k.clone(), JsonSchemaWithMerge::from(infer_schema(v))))
                .collect();
            JsonSchema::Object { properties }
        }
    }
}

/// Infer a top-level object schema, attaching each key's schema merge
/// (if one was supplied) onto that key's property schema.
pub fn infer_schema_with_merges(
    value: &serde_json::Value,
    merges: &SchemaMerges,
) -> JsonSchema {
    match value {
        serde_json::Value::Object(map) => {
            let properties = map
                .iter()
                .map(|(k, v)| {
                    let inner = infer_schema(v);
                    let with_merge = match merges.get(k) {
                        Some(merge) => JsonSchemaWithMerge {
                            schema: inner,
                            encoding: merge.encoding,
                            decoded_type: merge.decoded_type,
                            match_importance: merge.match_importance,
                        },
                        None => JsonSchemaWithMerge::from(inner),
                    };
                    (k.clone(), with_merge)
                })
                .collect();
            JsonSchema::Object { properties }
        }
        other => infer_schema(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_properties_always_present() {
        let schema = infer_schema(&json!({}));
        match schema {
            JsonSchema::Object { properties } => assert!(properties.is_empty()),
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn list_schema_is_first_element() {
        let schema = infer_schema(&json!([1, "two", 3.0]));
        match schema {
            JsonSchema::OrderedList { items } => {
                assert_eq!(*items.unwrap(), JsonSchema::Number);
            }
            _ => panic!("expected ordered list schema"),
        }
    }

    #[test]
    fn empty_list_has_no_items_schema() {
        let schema = infer_schema(&json!([]));
        match schema {
            JsonSchema::OrderedList { items } => assert!(items.is_none()),
            _ => panic!("expected ordered list schema"),
        }
    }

    #[test]
    fn nested_object_inference() {
        let schema = infer_schema(&json!({"a": {"b": true}}));
        match schema {
            JsonSchema::Object { properties } => match &properties["a"].schema {
                JsonSchema::Object { properties: inner } => {
                    assert_eq!(inner["b"].schema, JsonSchema::Boolean);
                }
                _ => panic!("expected nested object"),
            },
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn merges_attach_to_matching_top_level_key_only() {
        let mut merges = SchemaMerges::new();
        merges.insert(
            "token".to_string(),
            SchemaMerge {
                encoding: Some(Encoding::Base64),
                decoded_type: None,
                match_importance: Some(0.2),
            },
        );
        let schema = infer_schema_with_merges(&json!({"token": "abc", "other": 1}), &merges);
        match schema {
            JsonSchema::Object { properties } => {
                assert_eq!(properties["token"].encoding, Some(Encoding::Base64));
                assert_eq!(properties["token"].match_importance, Some(0.2));
                assert_eq!(properties["other"].encoding, None);
            }
            _ => panic!("expected object schema"),
        }
    }
}
