//! Completed event records delivered to the external consumer.
//!
//! Records are immutable once emitted. Each carries the identity captured
//! at entry, monotonic start/end stamps, the causal ids issued for the
//! occurrence, and the extracted value. Fixed-size name fields keep the
//! layout stable; byte-level encoding is the consumer's job.

use serde::{Deserialize, Serialize};

use crate::name::{EntityName, FieldName, LinkName};
use crate::value::ExtractedValue;

/// Per-occurrence causal identifiers, forming a trace-like parent/child
/// graph across nested operations. `parent_id == 0` marks a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalIds {
    pub self_id: u64,
    pub parent_id: u64,
}

/// One matched entry/exit pair of an entity-processing occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    /// OS thread key the occurrence ran on.
    pub thread: u64,
    pub entity: EntityName,
    /// 1-based nesting depth of this occurrence on its thread.
    pub depth: u32,
    pub start_ns: u64,
    pub end_ns: u64,
    /// Entity timestamp re-read at exit (post-processing).
    pub ts_sec: u32,
    pub ts_nsec: u32,
    pub ids: CausalIds,
    /// Primary value resolved through the metadata registry at exit.
    pub value: ExtractedValue,
}

/// One matched entry/exit pair of a field-write occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWriteEvent {
    pub thread: u64,
    pub entity: EntityName,
    pub field: FieldName,
    pub start_ns: u64,
    pub end_ns: u64,
    pub ids: CausalIds,
    pub value: ExtractedValue,
}

/// One matched entry/exit pair of a remote-write occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteWriteEvent {
    pub thread: u64,
    pub target: LinkName,
    pub start_ns: u64,
    pub end_ns: u64,
    pub ids: CausalIds,
    pub value: ExtractedValue,
}
