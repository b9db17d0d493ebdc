//! Demo driver: replays a synthetic probe sequence against an in-memory
//! image of the monitored process and prints the delivered records as
//! JSON lines. The real attachment layer wires the same handlers to live
//! probes; nothing here is part of the core engine.

use anyhow::Result;

use pvtrace::layout::{ENTITY_NAME_LEN, FIELD_NAME_LEN, LINK_NAME_LEN};
use pvtrace::{BufferMemory, MonotonicClock, SessionConfig, TraceSession};

const ENTITY: u64 = 0x1000;
const FIELD_DESCR: u64 = 0x2000;
const FIELD_NAME: u64 = 0x2100;
const RECORD_TYPE: u64 = 0x2200;
const RECORD_NODE: u64 = 0x2300;
const ENTRY_HANDLE: u64 = 0x2400;
const CREATE_NAME: u64 = 0x2500;
const ADDR_DESCR: u64 = 0x2600;
const WRITE_BUFFER: u64 = 0x3000;
const LINK: u64 = 0x4000;
const REMOTE_LINK: u64 = 0x4100;
const LINK_TARGET: u64 = 0x4200;

/// Offset of the primary value within the entity image.
const VALUE_OFFSET: u16 = 72;

fn padded(name: &str, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    let take = name.len().min(len - 1);
    buf[..take].copy_from_slice(&name.as_bytes()[..take]);
    buf
}

fn synthetic_image() -> BufferMemory {
    let mut mem = BufferMemory::new();

    // The entity: name + timestamp header, primary value (f64) appended.
    let mut entity = padded("demo:temperature", 64);
    entity.extend_from_slice(&120u32.to_le_bytes()); // ts_sec
    entity.extend_from_slice(&456u32.to_le_bytes()); // ts_nsec
    entity.extend_from_slice(&21.5f64.to_le_bytes());
    mem.map(ENTITY, entity);

    // Descriptor chain: entry handle -> node/type -> value field descriptor.
    let mut descr = Vec::new();
    descr.extend_from_slice(&FIELD_NAME.to_le_bytes());
    descr.extend_from_slice(&10i16.to_le_bytes()); // Double
    descr.extend_from_slice(&VALUE_OFFSET.to_le_bytes());
    mem.map(FIELD_DESCR, descr);
    mem.map(FIELD_NAME, padded("VAL", FIELD_NAME_LEN));
    mem.map(RECORD_TYPE, FIELD_DESCR.to_le_bytes().to_vec());
    let mut node = Vec::new();
    node.extend_from_slice(&ENTITY.to_le_bytes()); // name lives at the entity base
    node.extend_from_slice(&ENTITY.to_le_bytes());
    mem.map(RECORD_NODE, node);
    let mut handle = Vec::new();
    handle.extend_from_slice(&RECORD_NODE.to_le_bytes());
    handle.extend_from_slice(&RECORD_TYPE.to_le_bytes());
    mem.map(ENTRY_HANDLE, handle);
    mem.map(CREATE_NAME, padded("demo:temperature", ENTITY_NAME_LEN));
    let mut addr = Vec::new();
    addr.extend_from_slice(&ENTITY.to_le_bytes());
    addr.extend_from_slice(&FIELD_DESCR.to_le_bytes());
    mem.map(ADDR_DESCR, addr);

    // A write buffer and a remote link target.
    mem.map(WRITE_BUFFER, 98.25f64.to_le_bytes().to_vec());
    mem.map(LINK, REMOTE_LINK.to_le_bytes().to_vec());
    mem.map(REMOTE_LINK, LINK_TARGET.to_le_bytes().to_vec());
    mem.map(LINK_TARGET, padded("remote:setpoint", LINK_NAME_LEN));

    mem
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("replaying synthetic probe sequence");

    let (session, mut streams) =
        TraceSession::new(synthetic_image(), MonotonicClock::new(), SessionConfig::default());
    let thread = 7;

    // Registration, as the monitored process would do at startup.
    session.on_create_entry(thread, ENTRY_HANDLE, CREATE_NAME);
    session.on_create_exit(thread);

    // A processing occurrence with a nested field write and a remote write.
    session.on_process_entry(thread, ENTITY);
    session.on_field_write_entry(thread, ADDR_DESCR, 10, WRITE_BUFFER, 1);
    session.on_field_write_exit(thread);
    session.on_remote_write_entry(thread, LINK, 10, WRITE_BUFFER, 1, 0, 0);
    session.on_remote_write_exit(thread);
    session.on_process_exit(thread);

    while let Ok(event) = streams.lifecycle.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    while let Ok(event) = streams.field_writes.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    while let Ok(event) = streams.remote_writes.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }

    tracing::info!(known = session.known_entities(), "done");
    Ok(())
}
