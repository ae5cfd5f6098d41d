pub mod console;

use async_trait::async_trait;

use crate::metric::Metric;

/// Destination of collected metrics.
///
/// Every collector task hands over all of its metrics in one call, possibly
/// an empty batch. Delivery problems are the sink's own business, they are
/// never reported back to the caller.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn write(&self, metrics: Vec<Metric>);
}
