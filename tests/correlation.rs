mod common;

use pvtrace::SessionConfig;

const THREAD: u64 = 11;

#[test]
fn one_pair_emits_one_event_with_ordered_stamps() {
    let (session, mut streams, clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    clock.set(1_000);
    session.on_process_entry(THREAD, common::ENTITY);
    clock.advance(500);
    session.on_process_exit(THREAD);

    let event = streams.lifecycle.try_recv().expect("one event");
    assert_eq!(event.start_ns, 1_000);
    assert_eq!(event.end_ns, 1_500);
    assert!(event.end_ns >= event.start_ns);
    assert_eq!(event.depth, 1);
    assert_eq!(event.entity.as_str(), common::ENTITY_NAME);
    assert!(streams.lifecycle.try_recv().is_err(), "exactly one event");
}

#[test]
fn nested_pairs_match_lifo_per_level() {
    let (session, mut streams, clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    let n = 4;
    for i in 0..n {
        clock.set(1_000 * (i + 1));
        session.on_process_entry(THREAD, common::ENTITY);
    }
    for i in 0..n {
        clock.set(10_000 + 1_000 * i);
        session.on_process_exit(THREAD);
    }

    // Exits unwind deepest-first, so emission order is depth n..1.
    let mut events = Vec::new();
    while let Ok(event) = streams.lifecycle.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len() as u64, n);
    for (i, event) in events.iter().enumerate() {
        let depth = n as u32 - i as u32;
        assert_eq!(event.depth, depth);
        // Level k entered at k*1000 and exited in reverse order.
        assert_eq!(event.start_ns, 1_000 * depth as u64);
        assert_eq!(event.end_ns, 10_000 + 1_000 * i as u64);
        assert!(event.end_ns >= event.start_ns);
    }

    // Each event correlated to its own entry: all self ids distinct.
    let mut ids: Vec<u64> = events.iter().map(|e| e.ids.self_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len() as u64, n);
}

#[test]
fn unmatched_exit_is_skipped_and_later_pairs_survive() {
    let (session, mut streams, clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    // Attach-after-call-started: the exit fires with no live entry.
    session.on_process_exit(THREAD);
    assert!(streams.lifecycle.try_recv().is_err());

    clock.set(50);
    session.on_process_entry(THREAD, common::ENTITY);
    clock.advance(25);
    session.on_process_exit(THREAD);

    let event = streams.lifecycle.try_recv().expect("later pair unaffected");
    assert_eq!(event.start_ns, 50);
    assert_eq!(event.end_ns, 75);
}

#[test]
fn threads_correlate_independently() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    session.on_process_entry(1, common::ENTITY);
    session.on_process_entry(2, common::ENTITY);
    // Thread 2 exits first; thread 1's frame must be untouched.
    session.on_process_exit(2);
    session.on_process_exit(1);

    let first = streams.lifecycle.try_recv().unwrap();
    let second = streams.lifecycle.try_recv().unwrap();
    assert_eq!(first.thread, 2);
    assert_eq!(second.thread, 1);
    assert_eq!(first.depth, 1);
    assert_eq!(second.depth, 1);
}

#[test]
fn unreadable_entity_at_entry_produces_no_frame_and_no_event() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    session.on_process_entry(THREAD, 0xDEAD_0000);
    session.on_process_exit(THREAD);
    assert!(streams.lifecycle.try_recv().is_err());

    // Null entity pointer is equally silent.
    session.on_process_entry(THREAD, 0);
    session.on_process_exit(THREAD);
    assert!(streams.lifecycle.try_recv().is_err());
}

#[test]
fn reset_abandons_in_flight_frames() {
    let (session, mut streams, _clock) = common::session(SessionConfig::default());
    common::register_entity(&session, THREAD);

    session.on_process_entry(THREAD, common::ENTITY);
    session.reset();
    session.on_process_exit(THREAD);
    assert!(streams.lifecycle.try_recv().is_err());

    // The registry survives a reset.
    assert_eq!(session.known_entities(), 1);
}
