use std::sync::Mutex;

use async_trait::async_trait;

use crate::metric::Metric;
use crate::sinks::MetricSink;

/// Keeps every batch it receives, empty ones included.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<Metric>>>,
}

impl MemorySink {
    pub fn take(&self) -> Vec<Vec<Metric>> {
        std::mem::take(&mut *self.batches.lock().unwrap())
    }
}

#[async_trait]
impl MetricSink for MemorySink {
    async fn write(&self, metrics: Vec<Metric>) {
        self.batches.lock().unwrap().push(metrics);
    }
}
