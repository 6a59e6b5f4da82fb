//! Decision log sinks for optimization runs: a batched NDJSON file writer,
//! a structured-log sink, and an in-memory sink.

pub mod logger;
pub mod memory;
pub mod tracing_sink;

pub use logger::DecisionLogger;
pub use memory::InMemoryDecisionLog;
pub use tracing_sink::TracingDecisionLog;
