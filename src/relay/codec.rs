//! Text translation between the terminal and the TDD actions/events.
//!
//! AMI trims and splits on whitespace, so spaces travel as `_`. Line breaks
//! travel as the two-character marker `\n`.

pub const SPACE_PLACEHOLDER: char = '_';
pub const NEWLINE_MARKER: &str = "\\n";

/// Prepare operator text for a `TddTx` message.
pub fn encode_outbound(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => out.push(SPACE_PLACEHOLDER),
            '\n' => out.push_str(NEWLINE_MARKER),
            other => out.push(other),
        }
    }
    out
}

/// Turn a `TddRxMsg` payload back into display text.
pub fn decode_inbound(payload: &str) -> String {
    payload
        .replace(NEWLINE_MARKER, "\n")
        .replace(SPACE_PLACEHOLDER, " ")
}
