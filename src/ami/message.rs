//! AMI message framing: `Key: Value` lines terminated by CRLF, one blank line
//! between messages.

use std::io::{self, BufRead};

/// One AMI packet (action, response, or event). Header order is preserved and
/// lookups are case-insensitive, matching how Asterisk treats header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    headers: Vec<(String, String)>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an outbound action packet.
    pub fn action(name: &str) -> Self {
        Self::new().with("Action", name)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.headers.push((key.to_string(), value.into()));
    }

    /// Replace the first header named `key`, or append it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Header value, or `""` when absent.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn action_name(&self) -> Option<&str> {
        self.get("Action")
    }

    pub fn action_id(&self) -> Option<&str> {
        self.get("ActionID")
    }

    pub fn event_name(&self) -> Option<&str> {
        self.get("Event")
    }

    pub fn is_event(&self) -> bool {
        self.get("Event").is_some()
    }

    pub fn is_response(&self) -> bool {
        self.get("Response").is_some()
    }

    /// `Response: Success` (or `Goodbye` for Logoff).
    pub fn is_success(&self) -> bool {
        matches!(self.get("Response"), Some(r) if r.eq_ignore_ascii_case("success") || r.eq_ignore_ascii_case("goodbye"))
    }

    /// Last packet of a list action (`EventList: Complete`).
    pub fn is_list_complete(&self) -> bool {
        self.get("EventList")
            .is_some_and(|v| v.eq_ignore_ascii_case("complete"))
    }

    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.headers {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }

    /// Parse one header line. Lines without a colon carry no header and are skipped.
    fn push_line(&mut self, line: &str) {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                self.push(key, value.trim());
            }
        }
    }
}

/// Reads AMI packets from a buffered stream.
pub struct MessageReader<R> {
    inner: R,
    line: String,
}

impl<R: BufRead> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Read the greeting line (`Asterisk Call Manager/x.y.z`).
    pub fn read_banner(&mut self) -> io::Result<String> {
        self.line.clear();
        if self.inner.read_line(&mut self.line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before AMI banner",
            ));
        }
        Ok(self.line.trim_end().to_string())
    }

    /// Read the next packet. `Ok(None)` means the stream ended cleanly
    /// between packets.
    pub fn read_message(&mut self) -> io::Result<Option<Message>> {
        let mut message = Message::new();
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                if message.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-message",
                ));
            }
            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if message.is_empty() {
                    continue;
                }
                return Ok(Some(message));
            }
            message.push_line(line);
        }
    }
}
