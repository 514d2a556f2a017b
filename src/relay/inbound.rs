//! Inbound event handling: decoded TDD text from the PBX into the transcript.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use super::codec::decode_inbound;
use super::session::{Phase, Role, Session};
use crate::ami::{Message, TransportEvent, INBOUND_TEXT_EVENT, TOPOLOGY_EVENTS};
use crate::input::InputEvent;
use crate::{log_debug, log_debug_content};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotRelaying,
    NotTextEvent,
    OtherLeg,
}

/// What happened to one delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    TopologyChanged,
    Ignored(IgnoreReason),
    Displayed,
}

fn is_topology_event(name: &str) -> bool {
    TOPOLOGY_EVENTS.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Handle one event. The event is consumed: it is released when this returns,
/// whichever branch was taken.
///
/// Every check runs under the same session lock as the display write, so an
/// event for the previous leg cannot slip through during a leg handoff.
pub fn handle_event(session: &Session, event: Message) -> Disposition {
    let name = event.event_name().unwrap_or("");
    let mut guard = session.lock();

    if guard.state().phase != Phase::Relaying {
        if is_topology_event(name) {
            // Deferred: the selector re-lists on its next poll tick.
            if guard.state().phase == Phase::Selecting {
                guard.state_mut().refresh_needed = true;
            }
            return Disposition::TopologyChanged;
        }
        return Disposition::Ignored(IgnoreReason::NotRelaying);
    }
    if !name.eq_ignore_ascii_case(INBOUND_TEXT_EVENT) {
        return Disposition::Ignored(IgnoreReason::NotTextEvent);
    }
    if event.value("Channel") != guard.state().active_leg_id {
        return Disposition::Ignored(IgnoreReason::OtherLeg);
    }

    let payload = event.value("Message");
    let text = decode_inbound(payload);
    if let Err(err) = guard.write_as(Role::Remote, &text) {
        log_debug(&format!("display write failed: {err}"));
    }
    drop(guard);
    log_debug_content(&format!("rx {payload:?}"));
    Disposition::Displayed
}

/// Drain transport events into [`handle_event`] until the connection closes,
/// then post [`InputEvent::TransportClosed`] so the foreground loop unwinds.
pub fn spawn_event_pump(
    session: Arc<Session>,
    events: Receiver<TransportEvent>,
    input_tx: Sender<InputEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in events.iter() {
            match event {
                TransportEvent::Event(message) => {
                    let disposition = handle_event(&session, message);
                    if disposition == Disposition::TopologyChanged {
                        log_debug("channel topology changed");
                    }
                }
                TransportEvent::Disconnected => break,
            }
        }
        log_debug("AMI event stream ended");
        session.terminate();
        let _ = input_tx.send(InputEvent::TransportClosed);
    })
}
