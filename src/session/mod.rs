//! The correlation engine: per-call-site probe handlers and the shared
//! tables they orchestrate.
//!
//! # Safety invariant
//! Handlers run inline on the monitored process's threads. They must never
//! block, never allocate unboundedly, and never surface an error to the
//! monitored process. Failures show up only as missing data downstream.

mod context;
mod correlate;
mod registry;

pub mod dispatch;
pub mod emit;

pub use dispatch::TraceSession;
pub use emit::{EventClass, EventStreams, SessionConfig};
