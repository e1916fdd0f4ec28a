//! Errors surfaced by the batch processor and export adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("adapter \"{adapter}\" timed out after {timeout_secs}s")]
    AdapterTimeout { adapter: String, timeout_secs: u64 },

    #[error("adapter \"{adapter}\" failed: {source}")]
    AdapterFailed {
        adapter: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("filesystem adapter io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize span: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
