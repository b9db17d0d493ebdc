mod common;

use pvtrace::layout::ENTITY_NAME_LEN;
use pvtrace::{ExtractedValue, SessionConfig};

const THREAD: u64 = 9;

#[test]
fn process_exit_resolves_the_primary_value_through_the_registry() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);
    assert_eq!(session.known_entities(), 1);

    session.on_process_entry(THREAD, common::ENTITY);
    session.on_process_exit(THREAD);

    let event = streams.lifecycle.try_recv().unwrap();
    assert_eq!(event.entity.as_str(), common::ENTITY_NAME);
    assert_eq!(event.value, ExtractedValue::Double(common::PRIMARY_VALUE));
    assert_eq!(event.ts_sec, common::TS_SEC);
    assert_eq!(event.ts_nsec, common::TS_NSEC);
}

#[test]
fn unregistered_entity_still_emits_with_null_value() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());
    // No create/enumerate ran: the registry has never heard of the entity.

    session.on_process_entry(THREAD, common::ENTITY);
    session.on_process_exit(THREAD);

    let event = streams.lifecycle.try_recv().unwrap();
    assert_eq!(event.value, ExtractedValue::Null);
    assert_eq!(event.entity.as_str(), common::ENTITY_NAME);
    assert_eq!(event.ts_sec, common::TS_SEC);
}

#[test]
fn duplicate_creation_is_last_writer_wins() {
    let mut mem = common::image();

    // A second handle for the same name, whose record type resolves the
    // value as an unsigned short at offset 64 (the ts_sec field).
    let alt_descr: u64 = 0x5000;
    let alt_type: u64 = 0x5100;
    let alt_handle: u64 = 0x5200;
    let mut descr = Vec::new();
    descr.extend_from_slice(&common::FIELD_NAME_BUF.to_le_bytes());
    descr.extend_from_slice(&4i16.to_le_bytes()); // UShort
    descr.extend_from_slice(&64u16.to_le_bytes());
    mem.map(alt_descr, descr);
    mem.map(alt_type, common::le64(&[alt_descr]));
    mem.map(alt_handle, common::le64(&[common::RECORD_NODE, alt_type]));

    let (session, mut streams, _clock) = common::session_over(mem, SessionConfig::default());
    common::register_entity(&session, THREAD);
    session.on_create_entry(THREAD, alt_handle, common::CREATE_NAME);
    session.on_create_exit(THREAD);
    assert_eq!(session.known_entities(), 1, "same name overwrites");

    session.on_process_entry(THREAD, common::ENTITY);
    session.on_process_exit(THREAD);

    let event = streams.lifecycle.try_recv().unwrap();
    // ts_sec = 120 read back through the second handle's descriptor.
    assert_eq!(event.value, ExtractedValue::UInt(common::TS_SEC as u64));
}

#[test]
fn enumeration_registers_through_the_record_node() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());

    session.on_enumerate_entry(THREAD, common::ENTRY_HANDLE);
    session.on_enumerate_exit(THREAD);
    assert_eq!(session.known_entities(), 1);

    session.on_process_entry(THREAD, common::ENTITY);
    session.on_process_exit(THREAD);
    let event = streams.lifecycle.try_recv().unwrap();
    assert_eq!(event.value, ExtractedValue::Double(common::PRIMARY_VALUE));
}

#[test]
fn exit_without_pending_handle_is_a_no_op() {
    let (session, _streams, _clock) = common::session(SessionConfig::default());

    session.on_create_exit(THREAD);
    session.on_enumerate_exit(THREAD);
    assert_eq!(session.known_entities(), 0);

    // A create exit cannot consume an enumerate capture.
    session.on_enumerate_entry(THREAD, common::ENTRY_HANDLE);
    session.on_create_exit(THREAD);
    assert_eq!(session.known_entities(), 0);
}

#[test]
fn create_with_unreadable_name_registers_nothing() {
    let (session, _streams, _clock) = common::session(SessionConfig::default());

    session.on_create_entry(THREAD, common::ENTRY_HANDLE, 0xBAD_0000);
    session.on_create_exit(THREAD);
    assert_eq!(session.known_entities(), 0);
}

#[test]
fn create_scrubs_the_registry_key() {
    let mut mem = common::image();
    // Name buffer with garbage after the terminator, as a reused source
    // buffer would leave it. The scrubbed key must still match the clean
    // name read from the entity at process exit.
    let mut raw = vec![0u8; ENTITY_NAME_LEN];
    let name = common::ENTITY_NAME.as_bytes();
    raw[..name.len()].copy_from_slice(name);
    raw[name.len() + 1..name.len() + 9].copy_from_slice(b"staleold");
    mem.map(0x6000, raw);

    let (session, mut streams, _clock) = common::session_over(mem, SessionConfig::default());
    session.on_create_entry(THREAD, common::ENTRY_HANDLE, 0x6000);
    session.on_create_exit(THREAD);
    assert_eq!(session.known_entities(), 1);

    session.on_process_entry(THREAD, common::ENTITY);
    session.on_process_exit(THREAD);
    let event = streams.lifecycle.try_recv().unwrap();
    assert_eq!(event.value, ExtractedValue::Double(common::PRIMARY_VALUE));
}

#[test]
fn field_write_captures_names_and_value_at_entry() {
    let (session, mut streams, clock) = common::session(SessionConfig::default());

    clock.set(200);
    session.on_field_write_entry(THREAD, common::ADDR_DESCR, 10, common::WRITE_BUFFER, 1);
    clock.advance(40);
    session.on_field_write_exit(THREAD);

    let event = streams.field_writes.try_recv().unwrap();
    assert_eq!(event.entity.as_str(), common::ENTITY_NAME);
    assert_eq!(event.field.as_str(), "VAL");
    assert_eq!(event.value, ExtractedValue::Double(98.25));
    assert_eq!(event.start_ns, 200);
    assert_eq!(event.end_ns, 240);
}

#[test]
fn field_write_with_null_buffer_is_skipped() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());

    session.on_field_write_entry(THREAD, common::ADDR_DESCR, 10, 0, 1);
    session.on_field_write_exit(THREAD);
    assert!(streams.field_writes.try_recv().is_err());
}

#[test]
fn remote_write_follows_the_link_chain() {
    let (session, mut streams, clock) = common::session(SessionConfig::default());

    clock.set(300);
    session.on_remote_write_entry(THREAD, common::LINK, 10, common::WRITE_BUFFER, 1, 0, 0);
    clock.advance(10);
    session.on_remote_write_exit(THREAD);

    let event = streams.remote_writes.try_recv().unwrap();
    assert_eq!(event.target.as_str(), "remote:setpoint");
    assert_eq!(event.value, ExtractedValue::Double(98.25));
    assert_eq!(event.start_ns, 300);
    assert_eq!(event.end_ns, 310);
}

#[test]
fn remote_write_with_broken_link_is_skipped() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());

    session.on_remote_write_entry(THREAD, 0xBAD_0000, 10, common::WRITE_BUFFER, 1, 0, 0);
    session.on_remote_write_exit(THREAD);
    assert!(streams.remote_writes.try_recv().is_err());
}

#[test]
fn unsupported_write_tag_still_emits_with_null_value() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());

    session.on_field_write_entry(THREAD, common::ADDR_DESCR, 99, common::WRITE_BUFFER, 1);
    session.on_field_write_exit(THREAD);

    let event = streams.field_writes.try_recv().unwrap();
    assert_eq!(event.value, ExtractedValue::Null);
    assert_eq!(event.field.as_str(), "VAL");
}

#[test]
fn events_serialize_for_the_consumer() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    session.on_process_entry(THREAD, common::ENTITY);
    session.on_process_exit(THREAD);

    let event = streams.lifecycle.try_recv().unwrap();
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains(common::ENTITY_NAME));
}
