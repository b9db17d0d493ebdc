#![allow(dead_code)]

//! Shared fixture: a synthetic image of the monitored process's memory
//! with one registered entity and the descriptor chain the registry
//! consumers walk at process exit.

use pvtrace::layout::{ENTITY_NAME_LEN, FIELD_NAME_LEN, LINK_NAME_LEN};
use pvtrace::{BufferMemory, EventStreams, ManualClock, SessionConfig, TraceSession};

pub const ENTITY: u64 = 0x1000;
pub const FIELD_DESCR: u64 = 0x2000;
pub const FIELD_NAME_BUF: u64 = 0x2100;
pub const RECORD_TYPE: u64 = 0x2200;
pub const RECORD_NODE: u64 = 0x2300;
pub const ENTRY_HANDLE: u64 = 0x2400;
pub const CREATE_NAME: u64 = 0x2500;
pub const ADDR_DESCR: u64 = 0x2600;
pub const WRITE_BUFFER: u64 = 0x3000;
pub const LINK: u64 = 0x4000;
pub const REMOTE_LINK: u64 = 0x4100;
pub const LINK_TARGET: u64 = 0x4200;

pub const ENTITY_NAME: &str = "ioc:temperature";
pub const VALUE_OFFSET: u16 = 72;
pub const PRIMARY_VALUE: f64 = 21.5;
pub const TS_SEC: u32 = 120;
pub const TS_NSEC: u32 = 456;

pub fn padded(name: &str, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    let take = name.len().min(len - 1);
    buf[..take].copy_from_slice(&name.as_bytes()[..take]);
    buf
}

pub fn le64(values: &[u64]) -> Vec<u8> {
    let mut buf = Vec::new();
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

pub fn image() -> BufferMemory {
    let mut mem = BufferMemory::new();

    let mut entity = padded(ENTITY_NAME, 64);
    entity.extend_from_slice(&TS_SEC.to_le_bytes());
    entity.extend_from_slice(&TS_NSEC.to_le_bytes());
    entity.extend_from_slice(&PRIMARY_VALUE.to_le_bytes());
    mem.map(ENTITY, entity);

    let mut descr = Vec::new();
    descr.extend_from_slice(&FIELD_DESCR_NAME_PTR.to_le_bytes());
    descr.extend_from_slice(&10i16.to_le_bytes()); // Double
    descr.extend_from_slice(&VALUE_OFFSET.to_le_bytes());
    mem.map(FIELD_DESCR, descr);
    mem.map(FIELD_NAME_BUF, padded("VAL", FIELD_NAME_LEN));
    mem.map(RECORD_TYPE, le64(&[FIELD_DESCR]));
    mem.map(RECORD_NODE, le64(&[ENTITY, ENTITY]));
    mem.map(ENTRY_HANDLE, le64(&[RECORD_NODE, RECORD_TYPE]));
    mem.map(CREATE_NAME, padded(ENTITY_NAME, ENTITY_NAME_LEN));
    mem.map(ADDR_DESCR, le64(&[ENTITY, FIELD_DESCR]));

    mem.map(WRITE_BUFFER, 98.25f64.to_le_bytes().to_vec());
    mem.map(LINK, le64(&[REMOTE_LINK]));
    mem.map(REMOTE_LINK, le64(&[LINK_TARGET]));
    mem.map(LINK_TARGET, padded("remote:setpoint", LINK_NAME_LEN));

    mem
}

const FIELD_DESCR_NAME_PTR: u64 = FIELD_NAME_BUF;

pub type TestSession = TraceSession<BufferMemory, ManualClock>;

pub fn session(config: SessionConfig) -> (TestSession, EventStreams, ManualClock) {
    session_over(image(), config)
}

pub fn session_over(
    mem: BufferMemory,
    config: SessionConfig,
) -> (TestSession, EventStreams, ManualClock) {
    let clock = ManualClock::new();
    let (session, streams) = TraceSession::new(mem, clock.clone(), config);
    (session, streams, clock)
}

/// Register the fixture entity the way the creation probes would.
pub fn register_entity(session: &TestSession, thread: u64) {
    session.on_create_entry(thread, ENTRY_HANDLE, CREATE_NAME);
    session.on_create_exit(thread);
}
