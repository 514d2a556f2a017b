//! Raw keystroke interpretation for the relay phase.

pub const KEY_ESCAPE: u8 = 0x1b;
/// Ctrl-C as delivered by raw mode.
pub const KEY_INTERRUPT: u8 = 0x03;

/// Commands reachable with ESC + key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    DialNumber,
    NewLeg,
    Greeting,
    ClearScreen,
    ToggleTone,
}

impl Command {
    pub fn from_key(byte: u8) -> Option<Self> {
        match byte.to_ascii_lowercase() {
            b'q' => Some(Command::Quit),
            b'h' => Some(Command::Help),
            b'1' => Some(Command::DialNumber),
            b'2' => Some(Command::NewLeg),
            b'4' => Some(Command::Greeting),
            b'8' => Some(Command::ClearScreen),
            b'd' => Some(Command::ToggleTone),
            _ => None,
        }
    }
}

/// The result of feeding one byte to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// ESC seen; the next byte is a command.
    Pending,
    Ignored(u8),
    Command(Command),
    Digit(char),
    Text(char),
    Interrupt,
}

/// Touch-tone keys. Letters are uppercase only.
pub fn is_tone_key(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='D' | '*' | '#')
}

#[derive(Debug, Default)]
pub struct KeyInterpreter {
    escape_pending: bool,
    tone_mode: bool,
}

impl KeyInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tone_mode(&self) -> bool {
        self.tone_mode
    }

    pub fn toggle_tone_mode(&mut self) -> bool {
        self.tone_mode = !self.tone_mode;
        self.tone_mode
    }

    /// Command mode lasts for exactly one keystroke after ESC.
    pub fn feed(&mut self, byte: u8) -> KeyAction {
        if byte == KEY_INTERRUPT {
            self.escape_pending = false;
            return KeyAction::Interrupt;
        }
        if std::mem::take(&mut self.escape_pending) {
            return match Command::from_key(byte) {
                Some(command) => KeyAction::Command(command),
                None => KeyAction::Ignored(byte),
            };
        }
        match byte {
            KEY_ESCAPE => {
                self.escape_pending = true;
                KeyAction::Pending
            }
            b'\r' | b'\n' => KeyAction::Text('\n'),
            0x20..=0x7e => {
                let c = char::from(byte);
                if self.tone_mode && is_tone_key(c) {
                    KeyAction::Digit(c)
                } else {
                    KeyAction::Text(c)
                }
            }
            _ => KeyAction::Ignored(byte),
        }
    }
}
