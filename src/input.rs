//! Terminal input: a stdin reader thread plus the consumer-side byte/line reader.
//!
//! One reader thread feeds both phases. In raw mode each `read` returns a
//! keystroke or two; in line mode the kernel hands over a whole line.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::Duration;

use crate::log_debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Bytes(Vec<u8>),
    /// stdin reached end-of-input or failed.
    Eof,
    /// The AMI connection went away; posted by the event pump.
    TransportClosed,
}

pub fn spawn_input_thread(tx: Sender<InputEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buf = [0u8; 256];
        loop {
            let n = match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    log_debug(&format!("stdin read error: {err}"));
                    break;
                }
            };
            if tx.send(InputEvent::Bytes(buf[..n].to_vec())).is_err() {
                return;
            }
        }
        let _ = tx.send(InputEvent::Eof);
    })
}

/// What the foreground loops see when they ask for the next keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Byte(u8),
    Eof,
    TransportClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll {
    Line(String),
    /// Nothing complete arrived within the poll interval.
    Pending,
    Eof,
    TransportClosed,
}

/// Splits input chunks into single bytes and assembles lines.
///
/// Bytes that arrived in the same chunk as the one being consumed stay queued
/// here until asked for, so a loop that stops early leaves the rest unread.
pub struct InputReader {
    rx: Receiver<InputEvent>,
    pending: VecDeque<u8>,
    line: Vec<u8>,
    closed: Option<Input>,
}

impl InputReader {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            line: Vec::new(),
            closed: None,
        }
    }

    /// Block until a byte is available. There is no timeout.
    pub fn next_byte(&mut self) -> Input {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Input::Byte(byte);
            }
            if let Some(closed) = self.closed {
                return closed;
            }
            match self.rx.recv() {
                Ok(event) => self.absorb(event),
                Err(_) => self.closed = Some(Input::Eof),
            }
        }
    }

    /// Wait up to `timeout` for a full line. A partial line is kept across polls.
    pub fn poll_line(&mut self, timeout: Duration) -> LinePoll {
        if let Some(line) = self.take_line() {
            return LinePoll::Line(line);
        }
        if let Some(closed) = self.closed {
            return closed_poll(closed);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => self.absorb(event),
            Err(RecvTimeoutError::Timeout) => return LinePoll::Pending,
            Err(RecvTimeoutError::Disconnected) => self.closed = Some(Input::Eof),
        }
        if let Some(line) = self.take_line() {
            return LinePoll::Line(line);
        }
        match self.closed {
            Some(closed) => closed_poll(closed),
            None => LinePoll::Pending,
        }
    }

    /// Drop any bytes typed but not yet consumed.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.line.clear();
        while let Ok(event) = self.rx.try_recv() {
            if !matches!(event, InputEvent::Bytes(_)) {
                self.absorb(event);
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn absorb(&mut self, event: InputEvent) {
        match event {
            InputEvent::Bytes(bytes) => self.pending.extend(bytes),
            InputEvent::Eof => {
                self.closed.get_or_insert(Input::Eof);
            }
            // A closed transport outranks a closed stdin.
            InputEvent::TransportClosed => self.closed = Some(Input::TransportClosed),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        while let Some(byte) = self.pending.pop_front() {
            if byte == b'\n' || byte == b'\r' {
                let line = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                return Some(line);
            }
            self.line.push(byte);
        }
        None
    }
}

fn closed_poll(closed: Input) -> LinePoll {
    match closed {
        Input::TransportClosed => LinePoll::TransportClosed,
        _ => LinePoll::Eof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};

    #[test]
    fn next_byte_splits_chunks() {
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"ab".to_vec())).unwrap();
        let mut reader = InputReader::new(rx);
        assert_eq!(reader.next_byte(), Input::Byte(b'a'));
        assert!(reader.has_pending());
        assert_eq!(reader.next_byte(), Input::Byte(b'b'));
        assert!(!reader.has_pending());
    }

    #[test]
    fn next_byte_reports_eof_after_draining() {
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"x".to_vec())).unwrap();
        tx.send(InputEvent::Eof).unwrap();
        let mut reader = InputReader::new(rx);
        assert_eq!(reader.next_byte(), Input::Byte(b'x'));
        assert_eq!(reader.next_byte(), Input::Eof);
        assert_eq!(reader.next_byte(), Input::Eof);
    }

    #[test]
    fn dropped_sender_reads_as_eof() {
        let (tx, rx) = bounded::<InputEvent>(1);
        drop(tx);
        let mut reader = InputReader::new(rx);
        assert_eq!(reader.next_byte(), Input::Eof);
    }

    #[test]
    fn poll_line_keeps_partial_input_between_polls() {
        let (tx, rx) = unbounded();
        let mut reader = InputReader::new(rx);
        tx.send(InputEvent::Bytes(b"1".to_vec())).unwrap();
        assert_eq!(
            reader.poll_line(Duration::from_millis(10)),
            LinePoll::Pending
        );
        assert_eq!(
            reader.poll_line(Duration::from_millis(10)),
            LinePoll::Pending
        );
        tx.send(InputEvent::Bytes(b"2\n".to_vec())).unwrap();
        assert_eq!(
            reader.poll_line(Duration::from_millis(10)),
            LinePoll::Line("12".to_string())
        );
    }

    #[test]
    fn poll_line_returns_empty_line_for_bare_enter() {
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"\n".to_vec())).unwrap();
        let mut reader = InputReader::new(rx);
        assert_eq!(
            reader.poll_line(Duration::from_millis(10)),
            LinePoll::Line(String::new())
        );
    }

    #[test]
    fn transport_closed_is_reported_to_line_readers() {
        let (tx, rx) = unbounded();
        tx.send(InputEvent::TransportClosed).unwrap();
        let mut reader = InputReader::new(rx);
        assert_eq!(
            reader.poll_line(Duration::from_millis(10)),
            LinePoll::TransportClosed
        );
        assert_eq!(reader.next_byte(), Input::TransportClosed);
    }

    #[test]
    fn poll_line_accepts_carriage_return() {
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"555\r".to_vec())).unwrap();
        let mut reader = InputReader::new(rx);
        assert_eq!(
            reader.poll_line(Duration::from_millis(10)),
            LinePoll::Line("555".to_string())
        );
    }

    #[test]
    fn discard_pending_keeps_close_notifications() {
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"junk".to_vec())).unwrap();
        tx.send(InputEvent::TransportClosed).unwrap();
        let mut reader = InputReader::new(rx);
        reader.discard_pending();
        assert_eq!(reader.next_byte(), Input::TransportClosed);
    }
}
