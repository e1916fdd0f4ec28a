//! Export adapters — pluggable sinks the Batch Processor fans out to.

mod callback;
mod filesystem;
mod in_memory;

pub use callback::CallbackAdapter;
pub use filesystem::FilesystemAdapter;
pub use in_memory::InMemoryAdapter;

use crate::error::Result;
use async_trait::async_trait;
use tuskdrift_schema::CleanSpan;

/// A sink that a finished batch of spans is exported to.
///
/// Mirrors spec.md §4.6: `name`, `exportSpans`, `shutdown`.
#[async_trait]
pub trait ExportAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn export_spans(&self, spans: &[CleanSpan]) -> Result<()>;

    /// Flush/close any held resources. Default no-op.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Whether this adapter runs outside RECORD mode (spec.md §4.6: "only
    /// the in-memory and callback adapters run outside RECORD mode" —
    /// filesystem export is a RECORD-only concern).
    fn active_outside_record_mode(&self) -> bool {
        false
    }
}
