pub mod barrier;
pub mod collector;
pub mod config;
pub mod flatten;
pub mod heartbeat;
pub mod http;
pub mod metric;
pub mod monitor;
pub mod sinks;
pub mod stat;
#[cfg(test)]
mod testing;
pub mod trace;

pub use barrier::{CompletionBarrier, Registration};
pub use heartbeat::Heartbeat;
pub use metric::Metric;
pub use stat::{MetricConfig, Stat};

#[macro_use]
extern crate tracing;

/// The separator between every component of a metric path.
pub const METRIC_SEPARATOR: &str = "|";

pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
