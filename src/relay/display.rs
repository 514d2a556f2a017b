//! Fixed screen text and the stdout writer the session prints through.

use std::io::{self, Write};

pub const TITLE: &str = "*** TTYSpy ***\n";
pub const SELECT_HINT: &str =
    "Select the non-TTY side of the call (the leg the TTY user is talking to).\n\n";
pub const MENU: &str = "ESC + [H] Help [Q] Quit [1] Dial Number [2] Hangup [4] Send Greeting [8] Clear Screen [D] Toggle DTMF\n";
pub const GREETING: &str = "HELLO GA";
pub const DIAL_PROMPT: &str = "\nNBR: ";
pub const CALL_DISCONNECTED: &str = "*** CALL DISCONNECTED ***";

/// Writes to the real terminal. Raw mode turns off output post-processing,
/// so bare line feeds are expanded to CR LF here.
pub struct TerminalWriter<W: Write> {
    out: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl TerminalWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Write for TerminalWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, byte) in buf.iter().enumerate() {
            if *byte == b'\n' {
                self.out.write_all(&buf[start..i])?;
                self.out.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.out.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
