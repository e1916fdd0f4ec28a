//! Filesystem adapter — one JSONL file per trace (spec.md §4.6).
//!
//! Append-only, lazily-opened file handles, grounded on the storage
//! crate's `OpenOptions::append` + `BufWriter` log pattern.

use super::ExportAdapter;
use crate::error::{ExportError, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tuskdrift_schema::CleanSpan;

struct OpenFile {
    writer: BufWriter<File>,
}

/// Writes each trace's spans to `{dir}/{isoTimestamp}_trace_{traceId}.jsonl`,
/// one JSON object per line, in the order spans arrive.
pub struct FilesystemAdapter {
    dir: PathBuf,
    open_files: Mutex<HashMap<String, OpenFile>>,
}

impl FilesystemAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    fn file_path_for(&self, trace_id: &str) -> PathBuf {
        let iso = Utc::now().format("%Y%m%dT%H%M%SZ");
        self.dir.join(format!("{iso}_trace_{trace_id}.jsonl"))
    }

    fn write_line(&self, trace_id: &str, line: &str) -> Result<()> {
        let mut open_files = self.open_files.lock();
        if !open_files.contains_key(trace_id) {
            let path = self.file_path_for(trace_id);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            open_files.insert(trace_id.to_string(), OpenFile { writer: BufWriter::new(file) });
        }
        let entry = open_files.get_mut(trace_id).expect("just inserted");
        entry.writer.write_all(line.as_bytes())?;
        entry.writer.write_all(b"\n")?;
        entry.writer.flush()?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportAdapter for FilesystemAdapter {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn export_spans(&self, spans: &[CleanSpan]) -> Result<()> {
        for span in spans {
            let line = serde_json::to_string(span).map_err(ExportError::Serialize)?;
            self.write_line(&span.trace_id, &line)?;
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let mut open_files = self.open_files.lock();
        for (_, f) in open_files.iter_mut() {
            f.writer.flush()?;
        }
        open_files.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuskdrift_core::{PackageType, SpanKind, SpanStatus, TimestampPair};
    use tuskdrift_schema::JsonSchema;

    fn sample(trace_id: &str) -> CleanSpan {
        CleanSpan {
            trace_id: trace_id.into(),
            span_id: "s1".into(),
            parent_span_id: String::new(),
            name: "n".into(),
            package_name: "pkg".into(),
            instrumentation_name: "instr".into(),
            submodule_name: None,
            package_type: PackageType::Http,
            kind: SpanKind::Server,
            input_value: serde_json::Value::Null,
            output_value: serde_json::Value::Null,
            input_schema: JsonSchema::Null,
            output_schema: JsonSchema::Null,
            input_value_hash: "h".into(),
            output_value_hash: "h".into(),
            input_schema_hash: "h".into(),
            output_schema_hash: "h".into(),
            status: SpanStatus::Ok,
            timestamp: TimestampPair { seconds: 0, nanos: 0 },
            duration: TimestampPair { seconds: 0, nanos: 0 },
            is_root_span: true,
            is_pre_app_start: false,
            metadata: None,
            transform_metadata: None,
            is_used: false,
        }
    }

    #[tokio::test]
    async fn writes_one_jsonl_file_per_trace() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = FilesystemAdapter::new(tmp.path()).unwrap();
        adapter.export_spans(&[sample("trace-a"), sample("trace-b")]).await.unwrap();
        adapter.shutdown().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn appends_multiple_spans_to_same_trace_file() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = FilesystemAdapter::new(tmp.path()).unwrap();
        adapter.export_spans(&[sample("trace-a"), sample("trace-a")]).await.unwrap();
        adapter.shutdown().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
