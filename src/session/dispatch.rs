//! Probe entry/exit handlers for the instrumented call sites.
//!
//! Handlers run inline on whichever monitored-process thread fired the
//! probe: they must not block, and every failure is observation-only.
//! An unreadable pointer aborts that probe's work with no event and no
//! error propagated to the monitored process; an exit with no live entry
//! is a silent no-op.
//!
//! All shared tables are owned by the session and locked independently.
//! Per-key updates are effectively disjoint because the thread key is part
//! of every key except the name-keyed registry, which takes a read/write
//! lock. Locks are never held across each other.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::event::{CausalIds, FieldWriteEvent, ProcessEvent, RemoteWriteEvent};
use crate::layout::{
    link, remote_link, AddrSnapshot, EntitySnapshot, EntrySnapshot, FieldDescrSnapshot,
    RecordNodeSnapshot,
};
use crate::memory::ForeignMemory;
use crate::name::{EntityName, FieldName, LinkName};
use crate::session::context::ContextTracker;
use crate::session::correlate::CorrelationTable;
use crate::session::emit::{EventClass, EventEmitter, EventStreams, SessionConfig};
use crate::session::registry::EntityRegistry;
use crate::value::{extract, ExtractedValue, FieldType};

/// In-flight state of one entity-processing occurrence.
#[derive(Debug)]
struct ProcessFrame {
    entity_addr: u64,
    name: EntityName,
    start_ns: u64,
    ids: CausalIds,
    ts_sec: u32,
    ts_nsec: u32,
}

#[derive(Debug)]
struct FieldWriteFrame {
    entity: EntityName,
    field: FieldName,
    value: ExtractedValue,
    start_ns: u64,
    ids: CausalIds,
}

#[derive(Debug)]
struct RemoteWriteFrame {
    target: LinkName,
    value: ExtractedValue,
    start_ns: u64,
    ids: CausalIds,
}

/// Entry-time capture for the registry-producing sites, consumed at exit.
#[derive(Debug)]
enum PendingHandle {
    Create { entry_addr: u64, name: EntityName },
    Enumerate { entry_addr: u64 },
}

/// One tracing session over a monitored process.
///
/// Owns every shared table; passed by reference into each handler call
/// from the attachment layer. No process-wide singleton.
pub struct TraceSession<M, C> {
    mem: M,
    clock: C,
    contexts: Mutex<ContextTracker>,
    process: Mutex<CorrelationTable<ProcessFrame>>,
    field_writes: Mutex<CorrelationTable<FieldWriteFrame>>,
    remote_writes: Mutex<CorrelationTable<RemoteWriteFrame>>,
    pending: Mutex<HashMap<u64, PendingHandle>>,
    registry: RwLock<EntityRegistry>,
    emitter: EventEmitter,
}

/// A probe handler must not fault on a poisoned lock; recover the inner
/// state and keep going.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<M: ForeignMemory, C: Clock> TraceSession<M, C> {
    pub fn new(mem: M, clock: C, config: SessionConfig) -> (Self, EventStreams) {
        let (emitter, streams) = EventEmitter::bounded(&config);
        let session = Self {
            mem,
            clock,
            contexts: Mutex::new(ContextTracker::new()),
            process: Mutex::new(CorrelationTable::new()),
            field_writes: Mutex::new(CorrelationTable::new()),
            remote_writes: Mutex::new(CorrelationTable::new()),
            pending: Mutex::new(HashMap::new()),
            registry: RwLock::new(EntityRegistry::new()),
            emitter,
        };
        (session, streams)
    }

    // --- EntityProcess -----------------------------------------------------

    /// Entry of an entity-processing occurrence. Observes the entity
    /// pointer; captures a bounded snapshot and takes a causal step.
    pub fn on_process_entry(&self, thread: u64, entity_addr: u64) {
        if entity_addr == 0 {
            return;
        }
        let start_ns = self.clock.now_ns();
        let snap = match EntitySnapshot::read(&self.mem, entity_addr) {
            Ok(snap) => snap,
            Err(err) => {
                debug!(thread, %err, "process entry skipped");
                return;
            }
        };
        let ids = lock(&self.contexts).advance(thread);
        let depth = lock(&self.process).push(
            thread,
            ProcessFrame {
                entity_addr,
                name: snap.name,
                start_ns,
                ids,
                ts_sec: snap.ts_sec,
                ts_nsec: snap.ts_nsec,
            },
        );
        trace!(thread, depth, entity = %snap.name, "process entry");
    }

    /// Exit of an entity-processing occurrence. Pairs with the most recent
    /// unmatched entry on this thread and emits one lifecycle record.
    pub fn on_process_exit(&self, thread: u64) {
        let popped = lock(&self.process).pop(thread);
        let Some((frame, remaining)) = popped else {
            debug!(thread, "process exit without matching entry");
            return;
        };
        if remaining == 0 {
            self.maybe_clear_context(thread);
        }
        let end_ns = self.clock.now_ns();
        // Re-read the entity so the record carries the post-processing
        // timestamp; fall back to the entry snapshot if it vanished.
        let (ts_sec, ts_nsec) = match EntitySnapshot::read(&self.mem, frame.entity_addr) {
            Ok(snap) => (snap.ts_sec, snap.ts_nsec),
            Err(_) => (frame.ts_sec, frame.ts_nsec),
        };
        let value = self.resolve_primary_value(&frame.name);
        self.emitter.emit_lifecycle(ProcessEvent {
            thread,
            entity: frame.name,
            depth: remaining as u32 + 1,
            start_ns: frame.start_ns,
            end_ns,
            ts_sec,
            ts_nsec,
            ids: frame.ids,
            value,
        });
    }

    /// Walk the registry's descriptor chain to the entity's primary value
    /// field and extract it. Any broken link downgrades to `Null`: the
    /// record is still worth emitting without a value.
    fn resolve_primary_value(&self, name: &EntityName) -> ExtractedValue {
        let entry = match self.registry.read() {
            Ok(reg) => reg.lookup(name),
            Err(poisoned) => poisoned.into_inner().lookup(name),
        };
        let Some(entry) = entry else {
            trace!(entity = %name, "no registry entry, value null");
            return ExtractedValue::Null;
        };
        if entry.record_node == 0 || entry.record_type == 0 {
            return ExtractedValue::Null;
        }
        let Ok(node) = RecordNodeSnapshot::read(&self.mem, entry.record_node) else {
            return ExtractedValue::Null;
        };
        let Ok(value_field) = self.mem.read_u64(entry.record_type + crate::layout::record_type::VALUE_FIELD) else {
            return ExtractedValue::Null;
        };
        if node.entity == 0 || value_field == 0 {
            return ExtractedValue::Null;
        }
        let Ok(descr) = FieldDescrSnapshot::read(&self.mem, value_field) else {
            return ExtractedValue::Null;
        };
        let tag = FieldType::from_raw(descr.field_type);
        extract(&self.mem, tag, node.entity + descr.offset as u64)
    }

    // --- FieldWrite --------------------------------------------------------

    /// Entry of a field write. Observes the address descriptor, the raw
    /// type tag, and the source buffer; the value is captured here because
    /// the buffer may be gone by exit.
    pub fn on_field_write_entry(
        &self,
        thread: u64,
        addr_descr: u64,
        raw_tag: i16,
        buffer: u64,
        _count: u64,
    ) {
        if addr_descr == 0 || buffer == 0 {
            return;
        }
        let start_ns = self.clock.now_ns();
        let addr = match AddrSnapshot::read(&self.mem, addr_descr) {
            Ok(addr) => addr,
            Err(err) => {
                debug!(thread, %err, "field write entry skipped");
                return;
            }
        };
        if addr.entity == 0 || addr.field == 0 {
            return;
        }
        let Ok(entity) = EntityName::from_foreign(&self.mem, addr.entity + crate::layout::entity::NAME)
        else {
            return;
        };
        let Ok(descr) = FieldDescrSnapshot::read(&self.mem, addr.field) else {
            return;
        };
        let Ok(field) = FieldName::from_foreign(&self.mem, descr.name_ptr) else {
            return;
        };
        let value = extract(&self.mem, FieldType::from_raw(raw_tag), buffer);
        let ids = lock(&self.contexts).advance(thread);
        lock(&self.field_writes).push(
            thread,
            FieldWriteFrame { entity, field, value, start_ns, ids },
        );
    }

    pub fn on_field_write_exit(&self, thread: u64) {
        let popped = lock(&self.field_writes).pop(thread);
        let Some((frame, remaining)) = popped else {
            return;
        };
        if remaining == 0 {
            self.maybe_clear_context(thread);
        }
        self.emitter.emit_field_write(FieldWriteEvent {
            thread,
            entity: frame.entity,
            field: frame.field,
            start_ns: frame.start_ns,
            end_ns: self.clock.now_ns(),
            ids: frame.ids,
            value: frame.value,
        });
    }

    // --- EntityCreate / EntityEnumerateFirst -------------------------------

    /// Entry of an explicit entity creation. The name buffer is scrubbed
    /// here (truncate at the first NUL, clear the rest) so a reused source
    /// buffer cannot leak a stale suffix into the registry key.
    pub fn on_create_entry(&self, thread: u64, entry_addr: u64, name_addr: u64) {
        if entry_addr == 0 || name_addr == 0 {
            return;
        }
        let Ok(name) = EntityName::from_foreign(&self.mem, name_addr) else {
            debug!(thread, "create entry skipped, name unreadable");
            return;
        };
        trace!(thread, entity = %name, "create entry");
        lock(&self.pending).insert(thread, PendingHandle::Create { entry_addr, name });
    }

    /// Exit of an entity creation: the handle captured at entry is now
    /// fully populated, snapshot it into the registry.
    pub fn on_create_exit(&self, thread: u64) {
        let taken = lock(&self.pending).remove(&thread);
        let Some(PendingHandle::Create { entry_addr, name }) = taken else {
            return;
        };
        let Ok(entry) = EntrySnapshot::read(&self.mem, entry_addr) else {
            return;
        };
        match self.registry.write() {
            Ok(mut reg) => reg.insert(name, entry),
            Err(poisoned) => poisoned.into_inner().insert(name, entry),
        }
    }

    /// Entry of a bulk enumeration step: only the handle pointer is known.
    pub fn on_enumerate_entry(&self, thread: u64, entry_addr: u64) {
        if entry_addr == 0 {
            return;
        }
        lock(&self.pending).insert(thread, PendingHandle::Enumerate { entry_addr });
    }

    /// Exit of an enumeration step: follow the now-positioned handle to
    /// the entity's name and register it, same scrub as creation.
    pub fn on_enumerate_exit(&self, thread: u64) {
        let taken = lock(&self.pending).remove(&thread);
        let Some(PendingHandle::Enumerate { entry_addr }) = taken else {
            return;
        };
        let Ok(entry) = EntrySnapshot::read(&self.mem, entry_addr) else {
            return;
        };
        if entry.record_node == 0 {
            return;
        }
        let Ok(node) = RecordNodeSnapshot::read(&self.mem, entry.record_node) else {
            return;
        };
        if node.record_name == 0 {
            return;
        }
        let Ok(name) = EntityName::from_foreign(&self.mem, node.record_name) else {
            return;
        };
        trace!(thread, entity = %name, "enumerated");
        match self.registry.write() {
            Ok(mut reg) => reg.insert(name, entry),
            Err(poisoned) => poisoned.into_inner().insert(name, entry),
        }
    }

    // --- RemoteWrite -------------------------------------------------------

    /// Entry of a remote write. Follows link -> private block -> target
    /// name; takes the parent-preserving causal step.
    #[allow(clippy::too_many_arguments)]
    pub fn on_remote_write_entry(
        &self,
        thread: u64,
        link_addr: u64,
        raw_tag: i16,
        buffer: u64,
        _count: u64,
        _callback: u64,
        _callback_ctx: u64,
    ) {
        if link_addr == 0 || buffer == 0 {
            return;
        }
        let start_ns = self.clock.now_ns();
        let Ok(pvt) = self.mem.read_u64(link_addr + link::PVT) else {
            debug!(thread, "remote write entry skipped, link unreadable");
            return;
        };
        if pvt == 0 {
            return;
        }
        let Ok(target_ptr) = self.mem.read_u64(pvt + remote_link::TARGET_NAME) else {
            return;
        };
        if target_ptr == 0 {
            return;
        }
        let Ok(target) = LinkName::from_foreign(&self.mem, target_ptr) else {
            return;
        };
        let value = extract(&self.mem, FieldType::from_raw(raw_tag), buffer);
        let ids = lock(&self.contexts).advance_remote(thread);
        lock(&self.remote_writes).push(
            thread,
            RemoteWriteFrame { target, value, start_ns, ids },
        );
    }

    pub fn on_remote_write_exit(&self, thread: u64) {
        let popped = lock(&self.remote_writes).pop(thread);
        let Some((frame, _remaining)) = popped else {
            return;
        };
        // Remote writes do not clear causal state: later writes from the
        // same branch must keep reporting the same parent.
        self.emitter.emit_remote_write(RemoteWriteEvent {
            thread,
            target: frame.target,
            start_ns: frame.start_ns,
            end_ns: self.clock.now_ns(),
            ids: frame.ids,
            value: frame.value,
        });
    }

    // --- Shared state ------------------------------------------------------

    /// Clear a thread's causal context once nothing is outstanding on the
    /// context-advancing sites. Remote-write frames never hold the context
    /// open.
    fn maybe_clear_context(&self, thread: u64) {
        if lock(&self.process).depth(thread) == 0 && lock(&self.field_writes).depth(thread) == 0 {
            lock(&self.contexts).clear(thread);
        }
    }

    /// Dropped-record count for one event class (full-channel drops).
    pub fn dropped_events(&self, class: EventClass) -> u64 {
        self.emitter.dropped(class)
    }

    /// Number of entities currently known to the registry.
    pub fn known_entities(&self) -> usize {
        match self.registry.read() {
            Ok(reg) => reg.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// External reset: discard all in-flight correlations and causal
    /// contexts leaked by threads whose exits never arrived. The registry
    /// survives; it mirrors process-lifetime state, not in-flight state.
    pub fn reset(&self) {
        lock(&self.contexts).reset();
        lock(&self.process).reset();
        lock(&self.field_writes).reset();
        lock(&self.remote_writes).reset();
        lock(&self.pending).clear();
    }
}
