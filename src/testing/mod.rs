mod sink;
mod trace;

pub use sink::MemorySink;
pub use trace::trace_init;
