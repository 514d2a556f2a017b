use super::test_support::{FakeTransport, RecordingTerminal, SharedBuffer};
use super::*;
use crate::ami::{Message, OutboundAction, TransportEvent, INBOUND_TEXT_EVENT};
use crate::input::{InputEvent, InputReader};
use crossbeam_channel::unbounded;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn options() -> EngineOptions {
    EngineOptions {
        poll_interval: Duration::from_millis(10),
        digit_pause: Duration::ZERO,
        ..EngineOptions::default()
    }
}

#[test]
fn select_relay_and_quit_with_concurrent_inbound_text() {
    let transport = FakeTransport::with_legs(&["SIP/100-1", "SIP/200-2"]);
    let terminal = RecordingTerminal::default();
    let out = SharedBuffer::default();
    let session = Arc::new(Session::new(Box::new(out.clone())));
    let (events_tx, events_rx) = unbounded();
    let (input_tx, input_rx) = unbounded();
    let pump = spawn_event_pump(Arc::clone(&session), events_rx, input_tx.clone());
    let mut input = InputReader::new(input_rx);

    let exit = thread::scope(|scope| {
        scope.spawn(|| {
            wait_for("selection screen", || session.phase() == Phase::Selecting);
            input_tx.send(InputEvent::Bytes(b"1\n".to_vec())).unwrap();
            wait_for("relay", || session.phase() == Phase::Relaying);
            for (channel, text) in [("SIP/200-2", "WRONG_LEG"), ("SIP/100-1", "HELLO_THERE")] {
                let event = Message::new()
                    .with("Event", INBOUND_TEXT_EVENT)
                    .with("Channel", channel)
                    .with("Message", text);
                events_tx.send(TransportEvent::Event(event)).unwrap();
            }
            wait_for("inbound text", || out.contents().contains("HELLO THERE"));
            input_tx.send(InputEvent::Bytes(b"ok\x1bq".to_vec())).unwrap();
        });
        RelayEngine::new(&transport, &terminal, &session, options())
            .run(&mut input, &AtomicBool::new(false))
    });

    assert_eq!(exit, EngineExit::Quit);
    let transcript = out.contents();
    assert!(transcript.contains("\nTTY: HELLO THERE\nCA : ok"));
    assert!(!transcript.contains("WRONG LEG"));
    assert_eq!(
        transport.actions()[0],
        OutboundAction::EnableRelay {
            leg: "SIP/100-1".to_string()
        }
    );
    assert_eq!(terminal.transitions(), vec!["raw", "cooked"]);

    drop(events_tx);
    pump.join().unwrap();
}

#[test]
fn transport_disconnect_during_relay_ends_the_engine() {
    let transport = FakeTransport::with_legs(&["SIP/100-1"]);
    let terminal = RecordingTerminal::default();
    let session = Arc::new(Session::new(Box::new(SharedBuffer::default())));
    let (events_tx, events_rx) = unbounded();
    let (input_tx, input_rx) = unbounded();
    let pump = spawn_event_pump(Arc::clone(&session), events_rx, input_tx);
    let mut input = InputReader::new(input_rx);
    let options = EngineOptions {
        initial_leg: Some("SIP/100-1".to_string()),
        ..options()
    };

    let exit = thread::scope(|scope| {
        scope.spawn(|| {
            wait_for("relay", || session.phase() == Phase::Relaying);
            events_tx.send(TransportEvent::Disconnected).unwrap();
        });
        RelayEngine::new(&transport, &terminal, &session, options)
            .run(&mut input, &AtomicBool::new(false))
    });

    assert_eq!(exit, EngineExit::TransportClosed);
    assert_eq!(session.phase(), Phase::Terminating);
    pump.join().unwrap();
}
