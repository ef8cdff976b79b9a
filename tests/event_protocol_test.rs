// Integration test for the supervisor event listener handshake

use std::io::{BufReader, Cursor};
use uptimemon::events::{AckResult, EventListener};

#[test]
fn test_session_with_mixed_events() {
    let input = concat!(
        "ver:3.0 server:supervisor serial:1 pool:uptimemon poolserial:1 eventname:TICK_5 len:15\n",
        "when:1201063880",
        "ver:3.0 server:supervisor serial:2 pool:uptimemon poolserial:2 eventname:PROCESS_STATE_RUNNING len:50\n",
        "processname:cat groupname:cat from_state:STARTING ",
        "ver:3.0 server:supervisor serial:3 pool:uptimemon poolserial:3 eventname:TICK_3600 len:15\n",
        "when:1201067480",
    );
    let mut listener = EventListener::new(BufReader::new(Cursor::new(input)), Vec::new());

    let first = listener.wait_for_event().unwrap().unwrap();
    assert!(first.is_tick());
    listener.acknowledge(AckResult::Ok).unwrap();

    let second = listener.wait_for_event().unwrap().unwrap();
    assert!(!second.is_tick());
    assert_eq!(second.event_name(), "PROCESS_STATE_RUNNING");
    assert_eq!(
        second.payload_tokens().get("from_state").map(String::as_str),
        Some("STARTING")
    );
    listener.acknowledge(AckResult::Ok).unwrap();

    let third = listener.wait_for_event().unwrap().unwrap();
    assert_eq!(third.event_name(), "TICK_3600");
    assert_eq!(
        third.payload_tokens().get("when").map(String::as_str),
        Some("1201067480")
    );
    listener.acknowledge(AckResult::Fail).unwrap();

    assert!(listener.wait_for_event().unwrap().is_none());

    let output = String::from_utf8(listener.into_output()).unwrap();
    assert_eq!(
        output,
        "READY\nRESULT 2\nOKREADY\nRESULT 2\nOKREADY\nRESULT 4\nFAILREADY\n"
    );
}

#[test]
fn test_event_without_name_is_not_a_tick() {
    let mut listener = EventListener::new(Cursor::new(b"len:0\n".to_vec()), Vec::new());
    let event = listener.wait_for_event().unwrap().unwrap();
    assert_eq!(event.event_name(), "");
    assert!(!event.is_tick());
}
