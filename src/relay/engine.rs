//! Ties selection and relaying together for the life of the process.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use super::display::{CALL_DISCONNECTED, MENU, TITLE};
use super::input_loop::{RelayExit, RelayLoop};
use super::selector::{ChannelSelector, SelectOutcome};
use super::session::Session;
use crate::ami::{ActionOutcome, Leg, OutboundAction, Transport};
use crate::config::{DIGIT_PAUSE_MS, SELECT_POLL_MS};
use crate::input::InputReader;
use crate::log_debug;
use crate::terminal_restore::RawModeSwitch;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Relay this leg first instead of prompting.
    pub initial_leg: Option<String>,
    pub always_refresh: bool,
    pub poll_interval: Duration,
    pub digit_pause: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_leg: None,
            always_refresh: false,
            poll_interval: Duration::from_millis(SELECT_POLL_MS),
            digit_pause: Duration::from_millis(DIGIT_PAUSE_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    Quit,
    Interrupted,
    TransportClosed,
    InputClosed,
}

pub struct RelayEngine<'a> {
    transport: &'a dyn Transport,
    terminal: &'a dyn RawModeSwitch,
    session: &'a Session,
    options: EngineOptions,
}

impl<'a> RelayEngine<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        terminal: &'a dyn RawModeSwitch,
        session: &'a Session,
        options: EngineOptions,
    ) -> Self {
        Self {
            transport,
            terminal,
            session,
            options,
        }
    }

    pub fn run(&mut self, input: &mut InputReader, interrupt: &AtomicBool) -> EngineExit {
        let mut selector = ChannelSelector::new(
            self.transport,
            self.session,
            self.options.always_refresh,
            self.options.poll_interval,
        );
        let mut next_leg = self.options.initial_leg.take().map(|c| Leg::new(&c));

        loop {
            let leg = match next_leg.take() {
                Some(leg) => leg,
                None => {
                    input.discard_pending();
                    self.session.enter_selecting();
                    match selector.run(input, interrupt) {
                        SelectOutcome::Selected(leg) => leg,
                        SelectOutcome::Quit => return EngineExit::Quit,
                        SelectOutcome::Interrupted => return EngineExit::Interrupted,
                        SelectOutcome::TransportClosed => return EngineExit::TransportClosed,
                    }
                }
            };

            if let Err(notice) = self.enable_relay(&leg) {
                selector.set_notice(notice);
                continue;
            }
            self.show_banner();
            self.session.begin_relay(&leg.channel);

            if let Err(err) = self.terminal.enter_raw() {
                log_debug(&format!("failed to enter raw mode: {err}"));
            }
            let exit = RelayLoop::new(
                self.transport,
                self.terminal,
                self.session,
                &leg.channel,
                self.options.digit_pause,
            )
            .run(input, interrupt);
            if let Err(err) = self.terminal.leave_raw() {
                log_debug(&format!("failed to leave raw mode: {err}"));
            }
            self.session.end_relay();
            log_debug(&format!("relay on {} ended: {exit:?}", leg.channel));

            match exit {
                RelayExit::Quit => return EngineExit::Quit,
                RelayExit::Interrupted => return EngineExit::Interrupted,
                RelayExit::TransportClosed => return EngineExit::TransportClosed,
                RelayExit::InputClosed => return EngineExit::InputClosed,
                RelayExit::NewLeg => {}
                RelayExit::CallDisconnected => selector.set_notice(CALL_DISCONNECTED),
            }
        }
    }

    /// The leg only becomes active after the PBX accepts `TddRx`.
    fn enable_relay(&self, leg: &Leg) -> Result<(), String> {
        let action = OutboundAction::EnableRelay {
            leg: leg.channel.clone(),
        };
        match self.transport.perform(&action) {
            Ok(ActionOutcome::Accepted) => {
                log_debug(&format!("relay enabled on {}", leg.channel));
                Ok(())
            }
            Ok(ActionOutcome::Refused(reason)) => {
                log_debug(&format!("relay refused on {}: {reason}", leg.channel));
                Err(format!("Failed to enable TDD on {}: {reason}", leg.channel))
            }
            Err(err) => {
                log_debug(&format!("relay enable on {} failed: {err:#}", leg.channel));
                Err(format!("Failed to enable TDD on {}: {err}", leg.channel))
            }
        }
    }

    fn show_banner(&self) {
        let mut guard = self.session.lock();
        let result = guard
            .clear_screen()
            .and_then(|_| guard.print(&format!("{TITLE}{MENU}")));
        if let Err(err) = result {
            log_debug(&format!("display write failed: {err}"));
        }
    }
}
