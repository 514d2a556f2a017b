use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::ami::{ActionOutcome, Leg, OutboundAction, Transport};
use crate::terminal_restore::RawModeSwitch;

/// Cloneable in-memory display.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Scripted stand-in for the AMI connection.
///
/// `perform` pops outcomes from the script and falls back to `Accepted`;
/// a `None` entry fails the call the way a dead socket would.
#[derive(Default)]
pub(crate) struct FakeTransport {
    pub(crate) actions: Mutex<Vec<OutboundAction>>,
    pub(crate) outcomes: Mutex<VecDeque<Option<ActionOutcome>>>,
    pub(crate) legs: Mutex<Vec<Leg>>,
    pub(crate) list_calls: Mutex<usize>,
    pub(crate) fail_listing: Mutex<bool>,
}

impl FakeTransport {
    pub(crate) fn with_legs(channels: &[&str]) -> Self {
        let fake = Self::default();
        *fake.legs.lock().unwrap() = channels.iter().map(|c| Leg::new(c)).collect();
        fake
    }

    pub(crate) fn script(&self, outcome: Option<ActionOutcome>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub(crate) fn actions(&self) -> Vec<OutboundAction> {
        self.actions.lock().unwrap().clone()
    }

    pub(crate) fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

impl Transport for FakeTransport {
    fn perform(&self, action: &OutboundAction) -> Result<ActionOutcome> {
        self.actions.lock().unwrap().push(action.clone());
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Some(outcome)) => Ok(outcome),
            Some(None) => Err(anyhow!("connection reset")),
            None => Ok(ActionOutcome::Accepted),
        }
    }

    fn list_legs(&self) -> Result<Vec<Leg>> {
        *self.list_calls.lock().unwrap() += 1;
        if *self.fail_listing.lock().unwrap() {
            return Err(anyhow!("listing failed"));
        }
        Ok(self.legs.lock().unwrap().clone())
    }
}

/// Counts raw-mode transitions.
#[derive(Default)]
pub(crate) struct RecordingTerminal {
    pub(crate) transitions: Mutex<Vec<&'static str>>,
}

impl RecordingTerminal {
    pub(crate) fn transitions(&self) -> Vec<&'static str> {
        self.transitions.lock().unwrap().clone()
    }
}

impl RawModeSwitch for RecordingTerminal {
    fn enter_raw(&self) -> io::Result<()> {
        self.transitions.lock().unwrap().push("raw");
        Ok(())
    }

    fn leave_raw(&self) -> io::Result<()> {
        self.transitions.lock().unwrap().push("cooked");
        Ok(())
    }
}
