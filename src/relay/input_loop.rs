//! The relay-phase keystroke loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::codec::encode_outbound;
use super::display::{DIAL_PROMPT, GREETING, MENU};
use super::keys::{is_tone_key, Command, KeyAction, KeyInterpreter};
use super::session::{Role, Session};
use crate::ami::{ActionOutcome, OutboundAction, Transport};
use crate::input::{Input, InputReader, LinePoll};
use crate::terminal_restore::RawModeSwitch;
use crate::{log_debug, log_debug_content};

const DIAL_POLL: Duration = Duration::from_millis(100);

/// Why one relay phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    Quit,
    /// Operator asked for a different leg.
    NewLeg,
    /// An outbound action failed; the call is gone.
    CallDisconnected,
    TransportClosed,
    InputClosed,
    Interrupted,
}

pub struct RelayLoop<'a> {
    transport: &'a dyn Transport,
    terminal: &'a dyn RawModeSwitch,
    session: &'a Session,
    leg: &'a str,
    digit_pause: Duration,
    keys: KeyInterpreter,
}

impl<'a> RelayLoop<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        terminal: &'a dyn RawModeSwitch,
        session: &'a Session,
        leg: &'a str,
        digit_pause: Duration,
    ) -> Self {
        Self {
            transport,
            terminal,
            session,
            leg,
            digit_pause,
            keys: KeyInterpreter::new(),
        }
    }

    /// Read and dispatch keystrokes until something ends the phase. After a
    /// failed send no further input is consumed.
    pub fn run(&mut self, input: &mut InputReader, interrupt: &AtomicBool) -> RelayExit {
        loop {
            if interrupt.load(Ordering::SeqCst) {
                return RelayExit::Interrupted;
            }
            let byte = match input.next_byte() {
                Input::Byte(byte) => byte,
                Input::Eof => return RelayExit::InputClosed,
                Input::TransportClosed => return RelayExit::TransportClosed,
            };
            let stop = match self.keys.feed(byte) {
                KeyAction::Pending => None,
                KeyAction::Ignored(byte) => {
                    log_debug(&format!("ignored key 0x{byte:02x}"));
                    None
                }
                KeyAction::Interrupt => Some(RelayExit::Interrupted),
                KeyAction::Text(c) => self.send_text(&c.to_string()),
                KeyAction::Digit(digit) => self.send_digit(digit, true),
                KeyAction::Command(command) => self.dispatch(command, input, interrupt),
            };
            if let Some(exit) = stop {
                return exit;
            }
        }
    }

    fn dispatch(
        &mut self,
        command: Command,
        input: &mut InputReader,
        interrupt: &AtomicBool,
    ) -> Option<RelayExit> {
        log_debug(&format!("command {command:?}"));
        match command {
            Command::Quit => Some(RelayExit::Quit),
            Command::NewLeg => Some(RelayExit::NewLeg),
            Command::Help => {
                self.aside(&format!("\n{MENU}"));
                None
            }
            Command::Greeting => self.send_text(GREETING),
            Command::ClearScreen => {
                let mut guard = self.session.lock();
                if let Err(err) = guard.clear_screen() {
                    log_debug(&format!("display write failed: {err}"));
                }
                None
            }
            Command::ToggleTone => {
                let on = self.keys.toggle_tone_mode();
                self.aside(if on { "\n[DTMF ON]\n" } else { "\n[DTMF OFF]\n" });
                None
            }
            Command::DialNumber => self.dial(input, interrupt),
        }
    }

    /// The number is read in cooked mode, where Ctrl-C only raises the
    /// interrupt flag, so the wait polls the flag between ticks.
    fn dial(&mut self, input: &mut InputReader, interrupt: &AtomicBool) -> Option<RelayExit> {
        self.aside(DIAL_PROMPT);
        if let Err(err) = self.terminal.leave_raw() {
            log_debug(&format!("failed to leave raw mode: {err}"));
        }
        let line = loop {
            if interrupt.load(Ordering::SeqCst) {
                break None;
            }
            match input.poll_line(DIAL_POLL) {
                LinePoll::Pending => continue,
                done => break Some(done),
            }
        };
        if let Err(err) = self.terminal.enter_raw() {
            log_debug(&format!("failed to re-enter raw mode: {err}"));
        }
        let number = match line {
            None => return Some(RelayExit::Interrupted),
            Some(LinePoll::Line(number)) => number,
            Some(LinePoll::Eof | LinePoll::Pending) => return Some(RelayExit::InputClosed),
            Some(LinePoll::TransportClosed) => return Some(RelayExit::TransportClosed),
        };
        for digit in number.chars().filter(|c| is_tone_key(*c)) {
            if let Some(exit) = self.send_digit(digit, false) {
                return Some(exit);
            }
            thread::sleep(self.digit_pause);
        }
        None
    }

    /// Send one run of operator text and echo it once the PBX has it.
    fn send_text(&self, text: &str) -> Option<RelayExit> {
        let action = OutboundAction::SendText {
            leg: self.leg.to_string(),
            text: encode_outbound(text),
        };
        if let Some(exit) = self.perform(&action) {
            return Some(exit);
        }
        log_debug_content(&format!("tx {text:?}"));
        let mut guard = self.session.lock();
        if let Err(err) = guard.write_as(Role::Operator, text) {
            log_debug(&format!("display write failed: {err}"));
        }
        None
    }

    fn send_digit(&self, digit: char, echo: bool) -> Option<RelayExit> {
        let action = OutboundAction::SendDigit {
            leg: self.leg.to_string(),
            digit,
        };
        if let Some(exit) = self.perform(&action) {
            return Some(exit);
        }
        if echo {
            let mut guard = self.session.lock();
            if let Err(err) = guard.write_as(Role::Operator, &digit.to_string()) {
                log_debug(&format!("display write failed: {err}"));
            }
        }
        None
    }

    // Runs without the session lock held.
    fn perform(&self, action: &OutboundAction) -> Option<RelayExit> {
        match self.transport.perform(action) {
            Ok(ActionOutcome::Accepted) => None,
            Ok(ActionOutcome::Refused(reason)) => {
                log_debug(&format!(
                    "{} on {} refused: {reason}",
                    action.verb(),
                    action.leg()
                ));
                Some(RelayExit::CallDisconnected)
            }
            Err(err) => {
                log_debug(&format!(
                    "{} on {} failed: {err:#}",
                    action.verb(),
                    action.leg()
                ));
                Some(RelayExit::CallDisconnected)
            }
        }
    }

    /// Print text that belongs to neither party. The turn is left alone.
    fn aside(&self, text: &str) {
        if let Err(err) = self.session.lock().print(text) {
            log_debug(&format!("display write failed: {err}"));
        }
    }
}
