//! SIGINT handling for the cooked-mode phases (selection, dial prompt).
//!
//! Raw mode delivers Ctrl-C as a byte, so the relay loop sees it as input. Outside
//! raw mode the handler only raises a flag; the foreground loops poll it and
//! unwind through the normal terminal-restoring path.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPT_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
    INTERRUPT_RECEIVED.store(true, Ordering::SeqCst);
}

pub fn install_sigint_handler() -> Result<()> {
    unsafe {
        // SAFETY: handle_sigint only stores to an atomic, which is async-signal-safe.
        let handler = handle_sigint as *const () as libc::sighandler_t;
        if libc::signal(libc::SIGINT, handler) == libc::SIG_ERR {
            crate::log_debug("failed to install SIGINT handler");
            return Err(anyhow!("failed to install SIGINT handler"));
        }
    }
    Ok(())
}

/// The flag set by the SIGINT handler, handed to the relay engine.
pub fn interrupt_flag() -> &'static AtomicBool {
    &INTERRUPT_RECEIVED
}
