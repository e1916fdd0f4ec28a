//! Errors raised while compiling a rule set. Applying a compiled rule
//! never errors — failures there (bad base64, unparsable JSON) degrade
//! to a no-op on that rule, matching the rest of this workspace's "never
//! throw, log and move on" posture for per-span processing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("rule {index} specifies no target (expected exactly one of jsonPath/queryParam/headerName/urlPath/fullBody)")]
    MissingTarget { index: usize },

    #[error("rule {index} specifies more than one target; exactly one is required")]
    AmbiguousTarget { index: usize },

    #[error("rule {index} has invalid pathPattern: {source}")]
    InvalidPathPattern { index: usize, source: regex::Error },

    #[error("rule {index} has invalid host pattern: {source}")]
    InvalidHostPattern { index: usize, source: regex::Error },

    #[error("rule {index} has invalid method {method:?}")]
    InvalidMethod { index: usize, method: String },
}

pub type Result<T> = std::result::Result<T, TransformError>;
