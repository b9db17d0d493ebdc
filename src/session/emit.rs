//! Bounded, non-blocking delivery of completed event records.
//!
//! Three independent channels, one per event class. Push is best-effort:
//! a full channel drops the record and bumps a counter. Tracing must never
//! impose backpressure on the monitored process, so nothing here blocks,
//! retries, or waits for the consumer.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::event::{FieldWriteEvent, ProcessEvent, RemoteWriteEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Lifecycle,
    FieldWrite,
    RemoteWrite,
}

/// Channel capacities per event class.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub lifecycle_capacity: usize,
    pub field_write_capacity: usize,
    pub remote_write_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifecycle_capacity: 16,
            field_write_capacity: 16,
            remote_write_capacity: 16,
        }
    }
}

/// Consumer half of the three event channels. FIFO within each channel
/// relative to firing order on a given thread; no cross-channel ordering.
pub struct EventStreams {
    pub lifecycle: mpsc::Receiver<ProcessEvent>,
    pub field_writes: mpsc::Receiver<FieldWriteEvent>,
    pub remote_writes: mpsc::Receiver<RemoteWriteEvent>,
}

pub(crate) struct EventEmitter {
    lifecycle: mpsc::Sender<ProcessEvent>,
    field_writes: mpsc::Sender<FieldWriteEvent>,
    remote_writes: mpsc::Sender<RemoteWriteEvent>,
    dropped_lifecycle: AtomicU64,
    dropped_field_writes: AtomicU64,
    dropped_remote_writes: AtomicU64,
}

impl EventEmitter {
    pub fn bounded(config: &SessionConfig) -> (Self, EventStreams) {
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(config.lifecycle_capacity.max(1));
        let (field_tx, field_rx) = mpsc::channel(config.field_write_capacity.max(1));
        let (remote_tx, remote_rx) = mpsc::channel(config.remote_write_capacity.max(1));
        let emitter = Self {
            lifecycle: lifecycle_tx,
            field_writes: field_tx,
            remote_writes: remote_tx,
            dropped_lifecycle: AtomicU64::new(0),
            dropped_field_writes: AtomicU64::new(0),
            dropped_remote_writes: AtomicU64::new(0),
        };
        let streams = EventStreams {
            lifecycle: lifecycle_rx,
            field_writes: field_rx,
            remote_writes: remote_rx,
        };
        (emitter, streams)
    }

    pub fn emit_lifecycle(&self, event: ProcessEvent) {
        if self.lifecycle.try_send(event).is_err() {
            self.dropped_lifecycle.fetch_add(1, Ordering::Relaxed);
            debug!(class = "lifecycle", "event dropped, channel full or closed");
        }
    }

    pub fn emit_field_write(&self, event: FieldWriteEvent) {
        if self.field_writes.try_send(event).is_err() {
            self.dropped_field_writes.fetch_add(1, Ordering::Relaxed);
            debug!(class = "field_write", "event dropped, channel full or closed");
        }
    }

    pub fn emit_remote_write(&self, event: RemoteWriteEvent) {
        if self.remote_writes.try_send(event).is_err() {
            self.dropped_remote_writes.fetch_add(1, Ordering::Relaxed);
            debug!(class = "remote_write", "event dropped, channel full or closed");
        }
    }

    pub fn dropped(&self, class: EventClass) -> u64 {
        match class {
            EventClass::Lifecycle => self.dropped_lifecycle.load(Ordering::Relaxed),
            EventClass::FieldWrite => self.dropped_field_writes.load(Ordering::Relaxed),
            EventClass::RemoteWrite => self.dropped_remote_writes.load(Ordering::Relaxed),
        }
    }
}
