use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::{
    io::{self, Write},
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    },
};

static RAW_MODE_ENABLED: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Switches the operator terminal between raw keystroke input and the
/// original line-buffered, echoing mode.
pub trait RawModeSwitch {
    fn enter_raw(&self) -> io::Result<()>;
    fn leave_raw(&self) -> io::Result<()>;
}

/// RAII guard to restore terminal state on drop (and on panic via a shared hook).
pub struct TerminalRestoreGuard;

impl TerminalRestoreGuard {
    pub fn new() -> Self {
        install_terminal_panic_hook();
        TerminalRestoreGuard
    }

    pub fn restore(&self) {
        restore_terminal();
    }
}

impl RawModeSwitch for TerminalRestoreGuard {
    fn enter_raw(&self) -> io::Result<()> {
        if RAW_MODE_ENABLED.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        enable_raw_mode().inspect_err(|_| RAW_MODE_ENABLED.store(false, Ordering::SeqCst))
    }

    fn leave_raw(&self) -> io::Result<()> {
        if RAW_MODE_ENABLED.swap(false, Ordering::SeqCst) {
            disable_raw_mode()?;
        }
        Ok(())
    }
}

impl Default for TerminalRestoreGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalRestoreGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

pub fn restore_terminal() {
    if RAW_MODE_ENABLED.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
    }
    let mut stdout = io::stdout();
    let _ = execute!(stdout, Show);
    let _ = stdout.flush();
}

pub fn install_terminal_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal();
            crate::log_panic(info);
            previous(info);
        }));
    });
}

/// Terminal switch that does nothing, for running the relay without a TTY.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTerminal;

impl RawModeSwitch for NoTerminal {
    fn enter_raw(&self) -> io::Result<()> {
        Ok(())
    }

    fn leave_raw(&self) -> io::Result<()> {
        Ok(())
    }
}
