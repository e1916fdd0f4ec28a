//! Callback adapter — hands finished batches to a user-supplied function.
//! Errors raised by the callback are caught and reported, never
//! propagated past `export_spans` (spec.md §4.6).

use super::ExportAdapter;
use crate::error::Result;
use async_trait::async_trait;
use tuskdrift_schema::CleanSpan;

type Callback = Box<dyn Fn(&[CleanSpan]) -> std::result::Result<(), String> + Send + Sync>;

pub struct CallbackAdapter {
    callback: Callback,
}

impl CallbackAdapter {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[CleanSpan]) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl ExportAdapter for CallbackAdapter {
    fn name(&self) -> &str {
        "callback"
    }

    async fn export_spans(&self, spans: &[CleanSpan]) -> Result<()> {
        if let Err(message) = (self.callback)(spans) {
            tracing::warn!(error = %message, "callback adapter returned an error; dropping batch");
        }
        Ok(())
    }

    fn active_outside_record_mode(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tuskdrift_core::{PackageType, SpanKind, SpanStatus, TimestampPair};
    use tuskdrift_schema::JsonSchema;

    fn sample() -> CleanSpan {
        CleanSpan {
            trace_id: "t".into(),
            span_id: "s".into(),
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
    async fn invokes_callback_with_batch() {
        let seen = Arc::new(Mutex::new(0usize));
        let seen2 = seen.clone();
        let adapter = CallbackAdapter::new(move |spans| {
            *seen2.lock() += spans.len();
            Ok(())
        });
        adapter.export_spans(&[sample(), sample()]).await.unwrap();
        assert_eq!(*seen.lock(), 2);
    }

    #[tokio::test]
    async fn callback_error_is_caught_not_propagated() {
        let adapter = CallbackAdapter::new(|_| Err("boom".to_string()));
        assert!(adapter.export_spans(&[sample()]).await.is_ok());
    }
}
