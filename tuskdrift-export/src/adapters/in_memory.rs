//! In-memory adapter — bounded ring buffer, queryable by instrumentation
//! name (spec.md §4.6). Runs outside RECORD mode (tests, local debugging).

use super::ExportAdapter;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tuskdrift_schema::CleanSpan;

pub struct InMemoryAdapter {
    capacity: usize,
    spans: Mutex<VecDeque<CleanSpan>>,
}

impl InMemoryAdapter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            spans: Mutex::new(VecDeque::new()),
        }
    }

    pub fn all(&self) -> Vec<CleanSpan> {
        self.spans.lock().iter().cloned().collect()
    }

    pub fn by_instrumentation_name(&self, name: &str) -> Vec<CleanSpan> {
        self.spans
            .lock()
            .iter()
            .filter(|s| s.instrumentation_name == name)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.spans.lock().clear();
    }
}

#[async_trait]
impl ExportAdapter for InMemoryAdapter {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn export_spans(&self, spans: &[CleanSpan]) -> Result<()> {
        let mut buf = self.spans.lock();
        for span in spans {
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(span.clone());
        }
        Ok(())
    }

    fn active_outside_record_mode(&self) -> bool {
        true
    }
}
