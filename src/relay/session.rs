//! Shared session state and the single lock both relay flows write through.

use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use crate::lock::lock_or_recover;

/// Who produced a run of transcript text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The operator at this terminal (communications assistant).
    Operator,
    /// The far end, as decoded by the PBX.
    Remote,
}

impl Role {
    /// Printed once at the start of every run of text from this role.
    pub fn prefix(self) -> &'static str {
        match self {
            Role::Operator => "\nCA : ",
            Role::Remote => "\nTTY: ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Selecting,
    Relaying,
    Terminating,
}

/// Invariant: `active_leg_id` is non-empty exactly while `phase` is `Relaying`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub active_leg_id: String,
    /// `None` until the first transcript text of a relay phase.
    pub turn: Option<Role>,
    pub phase: Phase,
    pub refresh_needed: bool,
}

struct SessionInner {
    state: SessionState,
    display: Box<dyn Write + Send>,
}

/// The one session per process. Everything that touches `state` or the
/// display goes through [`Session::lock`].
pub struct Session {
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(display: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: SessionState::default(),
                display,
            }),
        }
    }

    pub fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            inner: lock_or_recover(&self.inner, "session"),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().state().clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state().phase
    }

    /// Enter channel selection. The first listing is always fresh.
    pub fn enter_selecting(&self) {
        let mut guard = self.lock();
        let state = guard.state_mut();
        if state.phase == Phase::Terminating {
            return;
        }
        state.phase = Phase::Selecting;
        state.active_leg_id.clear();
        state.refresh_needed = true;
    }

    /// Start relaying on `leg`. Called only once the relay is enabled on it.
    pub fn begin_relay(&self, leg: &str) {
        let mut guard = self.lock();
        let state = guard.state_mut();
        if state.phase == Phase::Terminating {
            return;
        }
        state.active_leg_id = leg.to_string();
        state.phase = Phase::Relaying;
        state.turn = None;
        state.refresh_needed = false;
    }

    pub fn end_relay(&self) {
        let mut guard = self.lock();
        let state = guard.state_mut();
        state.active_leg_id.clear();
        if state.phase != Phase::Terminating {
            state.phase = Phase::Idle;
        }
    }

    pub fn terminate(&self) {
        let mut guard = self.lock();
        let state = guard.state_mut();
        state.active_leg_id.clear();
        state.phase = Phase::Terminating;
    }

    pub fn request_refresh(&self) {
        self.lock().state_mut().refresh_needed = true;
    }

    /// Consume the refresh flag.
    pub fn take_refresh(&self) -> bool {
        std::mem::take(&mut self.lock().state_mut().refresh_needed)
    }
}

/// Held lock on the session. Keep it short: no network I/O while holding it.
pub struct SessionGuard<'a> {
    inner: MutexGuard<'a, SessionInner>,
}

impl SessionGuard<'_> {
    pub fn state(&self) -> &SessionState {
        &self.inner.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.inner.state
    }

    /// Append transcript text for `role`, printing the role prefix when the
    /// turn changes hands.
    pub fn write_as(&mut self, role: Role, text: &str) -> io::Result<()> {
        let inner = &mut *self.inner;
        if inner.state.turn != Some(role) {
            inner.display.write_all(role.prefix().as_bytes())?;
            inner.state.turn = Some(role);
        }
        inner.display.write_all(text.as_bytes())?;
        inner.display.flush()
    }

    /// Write text that belongs to neither party (menus, prompts, listings).
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        self.inner.display.write_all(text.as_bytes())?;
        self.inner.display.flush()
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.inner.display, MoveTo(0, 0), Clear(ClearType::All))?;
        self.inner.display.flush()
    }
}
