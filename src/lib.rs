//! Interactive profiling demo: naive computational workloads run under an
//! instrumentation harness, a repeat-and-time comparison harness, and an
//! artifact exporter for external analysis tools.

pub mod export;
pub mod harness;
pub mod profiler;
pub mod workloads;

pub use harness::Scale;
pub use profiler::run_with_profiling;
pub use workloads::Workload;
