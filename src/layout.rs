//! Foreign memory layout of the monitored process.
//!
//! These offsets and sizes are the ABI contract with the instrumented
//! runtime. The tracer only ever *reads* through this layout; nothing here
//! is written back. Pointers inside foreign structures are 64-bit
//! little-endian addresses in the monitored process's address space.

use crate::memory::{ForeignMemory, ReadError};
use crate::name::EntityName;

/// Entity names: up to 60 characters plus a terminator.
pub const ENTITY_NAME_LEN: usize = 61;
/// Field names within an entity's type descriptor.
pub const FIELD_NAME_LEN: usize = 41;
/// Remote link target names are allowed a longer buffer.
pub const LINK_NAME_LEN: usize = 100;
/// Bounded copy limit for extracted text values.
pub const MAX_STRING_SIZE: usize = 40;

/// A monitored entity (the runtime's common record header).
pub mod entity {
    /// Entity name, `ENTITY_NAME_LEN` bytes inline.
    pub const NAME: u64 = 0;
    /// Timestamp seconds, u32.
    pub const TS_SEC: u64 = 64;
    /// Timestamp nanoseconds, u32.
    pub const TS_NSEC: u64 = 68;
    pub const SIZE: usize = 72;
}

/// A database entry handle resolving an entity's descriptors.
pub mod entry_handle {
    /// Pointer to the entity's record node.
    pub const RECORD_NODE: u64 = 0;
    /// Pointer to the entity's record type descriptor.
    pub const RECORD_TYPE: u64 = 8;
    pub const SIZE: usize = 16;
}

/// A record node: links an entry handle back to the live entity.
pub mod record_node {
    /// Pointer to the entity's name buffer.
    pub const RECORD_NAME: u64 = 0;
    /// Pointer to the live entity base.
    pub const ENTITY: u64 = 8;
    pub const SIZE: usize = 16;
}

/// A record type descriptor.
pub mod record_type {
    /// Pointer to the field descriptor of the primary value field.
    pub const VALUE_FIELD: u64 = 0;
    pub const SIZE: usize = 8;
}

/// A field descriptor within a record type.
pub mod field_descr {
    /// Pointer to the field's name (`FIELD_NAME_LEN` bytes).
    pub const NAME: u64 = 0;
    /// Raw type tag, i16.
    pub const FIELD_TYPE: u64 = 8;
    /// Byte offset of the field within the entity, u16.
    pub const OFFSET: u64 = 10;
    pub const SIZE: usize = 12;
}

/// An address descriptor as passed to field-write call sites.
pub mod addr_descr {
    /// Pointer to the target entity base.
    pub const ENTITY: u64 = 0;
    /// Pointer to the target field's descriptor.
    pub const FIELD: u64 = 8;
    pub const SIZE: usize = 16;
}

/// A link structure as passed to remote-write call sites.
pub mod link {
    /// Pointer to the private remote link block.
    pub const PVT: u64 = 0;
    pub const SIZE: usize = 8;
}

/// The private block behind a remote link.
pub mod remote_link {
    /// Pointer to the remote target name (`LINK_NAME_LEN` bytes).
    pub const TARGET_NAME: u64 = 0;
    pub const SIZE: usize = 8;
}

/// Bounded snapshot of an entity header, captured at probe time.
#[derive(Debug, Clone, Copy)]
pub struct EntitySnapshot {
    pub name: EntityName,
    pub ts_sec: u32,
    pub ts_nsec: u32,
}

impl EntitySnapshot {
    pub fn read<M: ForeignMemory + ?Sized>(mem: &M, base: u64) -> Result<Self, ReadError> {
        Ok(Self {
            name: EntityName::from_foreign(mem, base + entity::NAME)?,
            ts_sec: mem.read_u32(base + entity::TS_SEC)?,
            ts_nsec: mem.read_u32(base + entity::TS_NSEC)?,
        })
    }
}

/// Snapshot of an entry handle, stored in the metadata registry.
#[derive(Debug, Clone, Copy)]
pub struct EntrySnapshot {
    pub record_node: u64,
    pub record_type: u64,
}

impl EntrySnapshot {
    pub fn read<M: ForeignMemory + ?Sized>(mem: &M, base: u64) -> Result<Self, ReadError> {
        Ok(Self {
            record_node: mem.read_u64(base + entry_handle::RECORD_NODE)?,
            record_type: mem.read_u64(base + entry_handle::RECORD_TYPE)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecordNodeSnapshot {
    pub record_name: u64,
    pub entity: u64,
}

impl RecordNodeSnapshot {
    pub fn read<M: ForeignMemory + ?Sized>(mem: &M, base: u64) -> Result<Self, ReadError> {
        Ok(Self {
            record_name: mem.read_u64(base + record_node::RECORD_NAME)?,
            entity: mem.read_u64(base + record_node::ENTITY)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescrSnapshot {
    pub name_ptr: u64,
    pub field_type: i16,
    pub offset: u16,
}

impl FieldDescrSnapshot {
    pub fn read<M: ForeignMemory + ?Sized>(mem: &M, base: u64) -> Result<Self, ReadError> {
        Ok(Self {
            name_ptr: mem.read_u64(base + field_descr::NAME)?,
            field_type: mem.read_i16(base + field_descr::FIELD_TYPE)?,
            offset: mem.read_u16(base + field_descr::OFFSET)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AddrSnapshot {
    pub entity: u64,
    pub field: u64,
}

impl AddrSnapshot {
    pub fn read<M: ForeignMemory + ?Sized>(mem: &M, base: u64) -> Result<Self, ReadError> {
        Ok(Self {
            entity: mem.read_u64(base + addr_descr::ENTITY)?,
            field: mem.read_u64(base + addr_descr::FIELD)?,
        })
    }
}
