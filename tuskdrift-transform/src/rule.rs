//! Rule configuration (the deserializable, author-facing shape) and the
//! compiled form the engine actually evaluates against — spec.md §4.9.

use crate::error::{Result, TransformError};
use http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// One of the five targets a rule may name, "exactlyOneOf" per spec.md
/// §4.9. `Drop` rules may omit a target entirely — a drop clears the
/// whole request, so there is nothing for a target to locate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTarget {
    JsonPath(String),
    QueryParam(String),
    HeaderName(String),
    UrlPath,
    FullBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionConfig {
    Redact {
        #[serde(default)]
        hash_prefix: Option<String>,
    },
    Mask {
        #[serde(default)]
        mask_char: Option<char>,
    },
    Replace {
        replace_with: String,
    },
    Drop,
}

/// The author-facing, deserializable rule shape (e.g. loaded from a
/// host app's config file — the loader itself is out of scope per
/// spec.md §1, this is just the shape it would produce).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub direction: Direction,
    #[serde(default)]
    pub method: Vec<String>,
    #[serde(default)]
    pub path_pattern: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub target: Option<RuleTarget>,
    pub action: ActionConfig,
}

pub(crate) const DEFAULT_HASH_PREFIX: &str = "REDACTED_";
pub(crate) const DEFAULT_MASK_CHAR: char = '*';

#[derive(Debug, Clone)]
pub(crate) enum CompiledAction {
    Redact { hash_prefix: String },
    Mask { mask_char: char },
    Replace { replace_with: String },
    Drop,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub direction: Direction,
    pub method: HashSet<Method>,
    pub path_pattern: Option<Regex>,
    pub host: Option<Regex>,
    pub target: Option<RuleTarget>,
    pub action: CompiledAction,
}

impl CompiledRule {
    pub(crate) fn compile(index: usize, config: &RuleConfig) -> Result<Self> {
        let is_drop = matches!(config.action, ActionConfig::Drop);
        match (&config.target, is_drop) {
            (None, false) => return Err(TransformError::MissingTarget { index }),
            _ => {}
        }

        let mut method = HashSet::new();
        for m in &config.method {
            let parsed = Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| TransformError::InvalidMethod {
                    index,
                    method: m.clone(),
                })?;
            method.insert(parsed);
        }

        let path_pattern = config
            .path_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|source| TransformError::InvalidPathPattern { index, source })?;

        let host = config
            .host
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|source| TransformError::InvalidHostPattern { index, source })?;

        let action = match &config.action {
            ActionConfig::Redact { hash_prefix } => CompiledAction::Redact {
                hash_prefix: hash_prefix.clone().unwrap_or_else(|| DEFAULT_HASH_PREFIX.to_string()),
            },
            ActionConfig::Mask { mask_char } => CompiledAction::Mask {
                mask_char: mask_char.unwrap_or(DEFAULT_MASK_CHAR),
            },
            ActionConfig::Replace { replace_with } => CompiledAction::Replace {
                replace_with: replace_with.clone(),
            },
            ActionConfig::Drop => CompiledAction::Drop,
        };

        Ok(Self {
            direction: config.direction,
            method,
            path_pattern,
            host,
            target: config.target.clone(),
            action,
        })
    }

    /// `method: []` matches any method (spec.md §8 scenario 6).
    pub(crate) fn matches_method(&self, method: Option<&Method>) -> bool {
        if self.method.is_empty() {
            return true;
        }
        method.is_some_and(|m| self.method.contains(m))
    }

    pub(crate) fn matches_path(&self, path: &str) -> bool {
        match &self.path_pattern {
            None => true,
            Some(re) => re.is_match(path),
        }
    }

    pub(crate) fn matches_host(&self, host: Option<&str>) -> bool {
        match &self.host {
            None => true,
            Some(re) => host.is_some_and(|h| re.is_match(h)),
        }
    }
}
