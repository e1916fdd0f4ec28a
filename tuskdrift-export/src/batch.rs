//! Batch Processor — spec.md §4.5.
//!
//! Bounded FIFO of finished-but-untransformed spans, drained into batches
//! of up to 512 either when full or on a 2s tick, filtered for
//! trace-blocking and size, transformed, then fanned out concurrently to
//! every active adapter with a per-adapter export timeout. Grounded on
//! the hook dispatcher's semaphore/timeout-per-unit pattern, adapted from
//! per-hook timeouts to per-adapter timeouts.

use crate::adapters::ExportAdapter;
use crate::transformer::transform_span;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tuskdrift_core::{AttrKey, RawSpanRecord, SpanKind, TraceBlockingManager};
use tuskdrift_schema::CleanSpan;

#[derive(Debug, Clone)]
pub struct BatchProcessorConfig {
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub export_timeout: Duration,
    /// Size-block threshold from spec.md §4.5 ("> 1 MiB").
    pub max_span_size_bytes: usize,
}

impl Default for BatchProcessorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 2048,
            batch_size: 512,
            flush_interval: Duration::from_millis(2000),
            export_timeout: Duration::from_secs(30),
            max_span_size_bytes: 1024 * 1024,
        }
    }
}

/// Which instrumentation libraries a raw span is allowed to come from.
/// Every span reaching this processor today was created through
/// `tuskdrift_core::start_span`, so in practice this is always this SDK;
/// the check exists so a host process that mixes in spans from another
/// instrumentation layer doesn't silently get them batched here too.
fn is_this_sdk(record: &RawSpanRecord) -> bool {
    !record.instrumentation_name.is_empty()
}

fn estimated_raw_size(record: &RawSpanRecord, overhead: usize) -> usize {
    let input_len = record
        .attributes
        .get(&AttrKey::InputValue)
        .map(String::len)
        .unwrap_or(0);
    let output_len = record
        .attributes
        .get(&AttrKey::OutputValue)
        .map(String::len)
        .unwrap_or(0);
    input_len + output_len + overhead
}

pub struct BatchProcessor {
    queue: Mutex<VecDeque<RawSpanRecord>>,
    config: BatchProcessorConfig,
    adapters: Vec<Arc<dyn ExportAdapter>>,
    blocking: Arc<TraceBlockingManager>,
    notify: Notify,
}

impl BatchProcessor {
    pub fn new(
        adapters: Vec<Arc<dyn ExportAdapter>>,
        blocking: Arc<TraceBlockingManager>,
        config: BatchProcessorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            config,
            adapters,
            blocking,
            notify: Notify::new(),
        })
    }

    /// Non-blocking enqueue of a just-ended span (spec.md §4.5 "enqueue is
    /// non-blocking"). Past capacity, drops the oldest batch-worth of
    /// entries and logs a warning rather than applying back-pressure to
    /// the caller.
    pub fn enqueue(&self, record: RawSpanRecord) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.config.queue_capacity {
            let drop_n = self.config.batch_size.min(queue.len());
            for _ in 0..drop_n {
                queue.pop_front();
            }
            tracing::warn!(
                dropped = drop_n,
                capacity = self.config.queue_capacity,
                "batch processor backpressure: dropped oldest unsent batch"
            );
        }
        queue.push_back(record);
        let should_flush_now = queue.len() >= self.config.batch_size;
        drop(queue);
        if should_flush_now {
            self.notify.notify_one();
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Spawn the timed flush loop. Returns a handle the caller can abort
    /// on shutdown.
    pub fn spawn_flush_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.flush_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = this.notify.notified() => {}
                }
                this.flush_once().await;
            }
        })
    }

    /// Drain up to one batch and export it. Exposed directly for tests
    /// and for an explicit shutdown-time final flush.
    pub async fn flush_once(&self) {
        let raw_batch = self.drain_batch();
        if raw_batch.is_empty() {
            return;
        }
        let clean = self.filter_and_transform(raw_batch);
        if clean.is_empty() {
            return;
        }
        self.fan_out(clean).await;
    }

    fn drain_batch(&self) -> Vec<RawSpanRecord> {
        let mut queue = self.queue.lock();
        let n = self.config.batch_size.min(queue.len());
        queue.drain(..n).collect()
    }

    /// spec.md §4.5(b)/(c): filter non-SDK spans, apply trace-blocking and
    /// size-blocking, then transform survivors into `CleanSpan`s. Order
    /// within the batch is preserved (drains in FIFO order, filters don't
    /// reorder).
    fn filter_and_transform(&self, batch: Vec<RawSpanRecord>) -> Vec<CleanSpan> {
        batch
            .into_iter()
            .filter(is_this_sdk)
            .filter_map(|record| {
                if self.blocking.is_blocked(record.trace_id) {
                    return None;
                }
                if record.kind == SpanKind::Server && record.status.is_error() {
                    self.blocking.block_trace(record.trace_id);
                    tracing::debug!(
                        trace_id = %record.trace_id,
                        "blocking trace: root server span ended in error"
                    );
                    return None;
                }
                let size = estimated_raw_size(&record, 50 * 1024);
                if size > self.config.max_span_size_bytes {
                    self.blocking.block_trace(record.trace_id);
                    tracing::warn!(
                        trace_id = %record.trace_id,
                        size_bytes = size,
                        "blocking trace: span exceeded size limit"
                    );
                    return None;
                }
                transform_span(record)
            })
            .collect()
    }

    async fn fan_out(&self, spans: Vec<CleanSpan>) {
        let spans = Arc::new(spans);
        let mut handles = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let adapter = adapter.clone();
            let spans = spans.clone();
            let timeout = self.config.export_timeout;
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(timeout, adapter.export_spans(&spans)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(adapter = adapter.name(), error = %err, "adapter export failed");
                    }
                    Err(_) => {
                        tracing::warn!(adapter = adapter.name(), "adapter export timed out");
                    }
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAdapter;
    use tuskdrift_core::{
        start_span, ContextState, PackageType, SpanKind, SpanStatus, StartSpanOptions,
    };

    fn make_record(kind: SpanKind, status: Option<SpanStatus>) -> RawSpanRecord {
        let blocking = TraceBlockingManager::new();
        let ctx = ContextState::root(true);
        let span = start_span(
            StartSpanOptions {
                name: "op".into(),
                package_name: "pkg".into(),
                instrumentation_name: "tuskdrift".into(),
                submodule_name: None,
                package_type: PackageType::Http,
                kind,
                is_pre_app_start: false,
                trace_id_override: None,
            },
            &ctx,
            &blocking,
        )
        .unwrap();
        span.end(status).unwrap()
    }

    #[tokio::test]
    async fn flush_exports_enqueued_spans_to_adapter() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let blocking = Arc::new(TraceBlockingManager::new());
        let processor = BatchProcessor::new(adapters, blocking, BatchProcessorConfig::default());

        processor.enqueue(make_record(SpanKind::Client, Some(SpanStatus::Ok)));
        processor.flush_once().await;

        assert_eq!(in_memory.len(), 1);
    }

    #[tokio::test]
    async fn server_span_error_blocks_trace_and_drops_span() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let blocking = Arc::new(TraceBlockingManager::new());
        let processor = BatchProcessor::new(adapters, blocking.clone(), BatchProcessorConfig::default());

        let record = make_record(
            SpanKind::Server,
            Some(SpanStatus::Error { message: Some("boom".into()) }),
        );
        let trace_id = record.trace_id;
        processor.enqueue(record);
        processor.flush_once().await;

        assert!(blocking.is_blocked(trace_id));
        assert_eq!(in_memory.len(), 0);
    }

    #[tokio::test]
    async fn backpressure_drops_oldest_batch_worth_when_over_capacity() {
        let in_memory = Arc::new(InMemoryAdapter::new(10_000));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory];
        let blocking = Arc::new(TraceBlockingManager::new());
        let config = BatchProcessorConfig {
            queue_capacity: 4,
            batch_size: 2,
            ..BatchProcessorConfig::default()
        };
        let processor = BatchProcessor::new(adapters, blocking, config);

        for _ in 0..6 {
            processor.enqueue(make_record(SpanKind::Client, Some(SpanStatus::Ok)));
        }
        assert!(processor.queue_len() <= 4);
    }

    #[tokio::test]
    async fn oversized_span_blocks_trace() {
        let in_memory = Arc::new(InMemoryAdapter::new(100));
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![in_memory.clone()];
        let blocking = Arc::new(TraceBlockingManager::new());
        let config = BatchProcessorConfig {
            max_span_size_bytes: 10,
            ..BatchProcessorConfig::default()
        };
        let processor = BatchProcessor::new(adapters, blocking.clone(), config);

        let mut record = make_record(SpanKind::Client, Some(SpanStatus::Ok));
        record
            .attributes
            .insert(AttrKey::InputValue, "x".repeat(1000));
        let trace_id = record.trace_id;
        processor.enqueue(record);
        processor.flush_once().await;

        assert!(blocking.is_blocked(trace_id));
        assert_eq!(in_memory.len(), 0);
    }
}
