//! Transform Engine — spec.md §4.9.
//!
//! Rules are compiled once at initialization
//! ([`TransformEngine::compile`]) into predicates + actions; drivers
//! then call [`TransformEngine::should_drop_inbound_request`] before
//! creating a span for an inbound request, and
//! [`TransformEngine::apply`] once a span's input/output values are
//! available.
//!
//! Grounded on `agentreplay-plugins/core/src/hooks/config.rs`'s
//! declarative-rule-compiled-once shape, combined with this workspace's
//! `regex`/`url`/`base64` stack for path/query/body rewriting.

use crate::action::apply_to_string;
use crate::error::{Result, TransformError};
use crate::rule::{CompiledAction, CompiledRule, Direction, RuleConfig, RuleTarget};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One applied-rule record, appended to a span's `transformMetadata`
/// (spec.md §4.9: `{type, field, reason: "transforms", description?}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformActionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub field: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransformActionRecord {
    fn new(kind: &str, field: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            field: field.into(),
            reason: "transforms".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformMetadata {
    pub actions: Vec<TransformActionRecord>,
}

impl TransformMetadata {
    fn push(&mut self, record: TransformActionRecord) {
        self.actions.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Everything the engine needs to evaluate a rule's matcher against one
/// request, independent of which driver produced it.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    pub direction: Direction,
    pub method: Option<&'a Method>,
    pub host: Option<&'a str>,
    /// `inputValue.path` (outbound) or `inputValue.url` (inbound).
    pub path: &'a str,
}

pub struct TransformEngine {
    rules: Vec<CompiledRule>,
}

impl TransformEngine {
    pub fn compile(configs: &[RuleConfig]) -> Result<Self> {
        let rules = configs
            .iter()
            .enumerate()
            .map(|(i, c)| CompiledRule::compile(i, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    fn matches(&self, rule: &CompiledRule, meta: &RequestMeta) -> bool {
        rule.direction == meta.direction
            && rule.matches_method(meta.method)
            && rule.matches_path(meta.path)
            && rule.matches_host(meta.host)
    }

    /// spec.md §4.9: "`drop` action, when matched on an inbound request
    /// before a span exists, prevents trace creation entirely (the
    /// driver must query `shouldDropInboundRequest` prior to starting a
    /// span)." Only inbound-direction drop rules are considered here;
    /// target is irrelevant to a whole-request drop.
    pub fn should_drop_inbound_request(&self, meta: &RequestMeta) -> bool {
        self.rules.iter().any(|r| {
            matches!(r.action, CompiledAction::Drop)
                && r.direction == Direction::Inbound
                && self.matches(r, meta)
        })
    }

    /// Apply every matching rule to a span's input/output values in
    /// rule-declaration order. Field-targeted actions (jsonPath,
    /// queryParam, headerName, urlPath, fullBody) operate on
    /// `input_value` — spec.md §4.9 only ever names `inputValue.path` /
    /// `inputValue.url` / "input body" as targets. A `drop` rule
    /// matching here (span already exists — e.g. an outbound call, or a
    /// redundant match on an inbound request that already has a span)
    /// clears both `input_value` and `output_value` in place.
    pub fn apply(
        &self,
        meta: &RequestMeta,
        input_value: &mut Value,
        output_value: &mut Value,
    ) -> TransformMetadata {
        let mut metadata = TransformMetadata::default();

        for rule in &self.rules {
            if !self.matches(rule, meta) {
                continue;
            }

            if matches!(rule.action, CompiledAction::Drop) {
                *input_value = Value::Null;
                *output_value = Value::Null;
                metadata.push(TransformActionRecord::new("drop", "*"));
                break;
            }

            let Some(target) = &rule.target else { continue };
            if let Some(record) = apply_target(target, &rule.action, input_value) {
                metadata.push(record);
            }
        }

        metadata
    }
}

fn action_kind_name(action: &CompiledAction) -> &'static str {
    match action {
        CompiledAction::Redact { .. } => "redact",
        CompiledAction::Mask { .. } => "mask",
        CompiledAction::Replace { .. } => "replace",
        CompiledAction::Drop => "drop",
    }
}

fn apply_target(
    target: &RuleTarget,
    action: &CompiledAction,
    input_value: &mut Value,
) -> Option<TransformActionRecord> {
    match target {
        RuleTarget::JsonPath(path) => apply_json_path(path, action, input_value),
        RuleTarget::QueryParam(name) => apply_query_param(name, action, input_value),
        RuleTarget::HeaderName(name) => apply_header(name, action, input_value),
        RuleTarget::UrlPath => apply_url_path(action, input_value),
        RuleTarget::FullBody => apply_full_body(action, input_value),
    }
}

/// `jsonPath`: the `body` field is always base64; decode, JSON-parse,
/// locate matches with `jsonpath_lib`, apply the action to each matched
/// leaf, re-serialize, re-encode base64 (spec.md §4.9).
fn apply_json_path(
    path: &str,
    action: &CompiledAction,
    input_value: &mut Value,
) -> Option<TransformActionRecord> {
    use base64::Engine;

    let body_b64 = input_value.get("body")?.as_str()?.to_string();
    let decoded = base64::engine::general_purpose::STANDARD.decode(&body_b64).ok()?;
    let body_json: Value = serde_json::from_slice(&decoded).ok()?;

    let mut matched = false;
    let transformed = jsonpath_lib::replace_with(body_json, path, &mut |v| {
        matched = true;
        let as_string = match &v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some(Value::String(apply_to_string(action, &as_string)))
    });

    let transformed = match transformed {
        Ok(v) if matched => v,
        _ => return None,
    };

    let reencoded = serde_json::to_vec(&transformed).ok()?;
    let new_b64 = base64::engine::general_purpose::STANDARD.encode(reencoded);
    input_value["body"] = Value::String(new_b64);

    Some(TransformActionRecord::new(
        action_kind_name(action),
        format!("jsonPath:{path}"),
    ))
}

/// `queryParam`: rewrite a named query parameter in `path`/`url`, per
/// spec.md §4.9. Works for both an absolute URL (`inputValue.url`,
/// inbound) and a path-only string that may carry its own query string
/// (`inputValue.path`, outbound).
fn apply_query_param(
    name: &str,
    action: &CompiledAction,
    input_value: &mut Value,
) -> Option<TransformActionRecord> {
    let field = if input_value.get("url").is_some() { "url" } else { "path" };
    let raw = input_value.get(field)?.as_str()?.to_string();

    let rewritten = rewrite_query_param(&raw, action, name)?;
    input_value[field] = Value::String(rewritten);

    Some(TransformActionRecord::new(
        action_kind_name(action),
        format!("queryParam:{name}"),
    ))
}

fn rewrite_query_param(raw: &str, action: &CompiledAction, name: &str) -> Option<String> {
    let is_absolute = raw.starts_with("http://") || raw.starts_with("https://");
    let full = if is_absolute {
        raw.to_string()
    } else {
        format!("http://td-placeholder.invalid{raw}")
    };
    let mut url = url::Url::parse(&full).ok()?;

    let mut found = false;
    let new_pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == name {
                found = true;
                (k.into_owned(), apply_to_string(action, &v))
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    if !found {
        return None;
    }

    url.query_pairs_mut().clear().extend_pairs(&new_pairs);

    if is_absolute {
        Some(url.to_string())
    } else {
        let mut out = url.path().to_string();
        if let Some(q) = url.query() {
            out.push('?');
            out.push_str(q);
        }
        Some(out)
    }
}

/// `headerName`: case-insensitive match against request headers only
/// (spec.md §4.9).
fn apply_header(
    name: &str,
    action: &CompiledAction,
    input_value: &mut Value,
) -> Option<TransformActionRecord> {
    let headers = input_value.get_mut("headers")?.as_object_mut()?;
    let key = headers.keys().find(|k| k.eq_ignore_ascii_case(name))?.clone();
    let current = headers.get(&key)?.as_str()?.to_string();
    headers.insert(key.clone(), Value::String(apply_to_string(action, &current)));

    Some(TransformActionRecord::new(
        action_kind_name(action),
        format!("headerName:{key}"),
    ))
}

/// `urlPath`: rewrite the whole `path`/`url` field.
fn apply_url_path(action: &CompiledAction, input_value: &mut Value) -> Option<TransformActionRecord> {
    let field = if input_value.get("url").is_some() { "url" } else { "path" };
    let current = input_value.get(field)?.as_str()?.to_string();
    input_value[field] = Value::String(apply_to_string(action, &current));

    Some(TransformActionRecord::new(action_kind_name(action), "urlPath"))
}

/// `fullBody`: the whole `body` field, base64-decoded, transformed as a
/// single string, re-encoded — spec.md §4.9.
fn apply_full_body(action: &CompiledAction, input_value: &mut Value) -> Option<TransformActionRecord> {
    use base64::Engine;

    let body_b64 = input_value.get("body")?.as_str()?.to_string();
    let decoded = base64::engine::general_purpose::STANDARD.decode(&body_b64).ok()?;
    let as_string = String::from_utf8(decoded).ok()?;

    let transformed = apply_to_string(action, &as_string);
    let reencoded = base64::engine::general_purpose::STANDARD.encode(transformed);
    input_value["body"] = Value::String(reencoded);

    Some(TransformActionRecord::new(action_kind_name(action), "fullBody"))
}
