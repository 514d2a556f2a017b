//! The session relay engine: channel selection, the keystroke loop, and the
//! inbound event handler, sharing one locked session.

mod codec;
mod display;
mod engine;
mod inbound;
mod input_loop;
mod keys;
mod selector;
mod session;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use codec::{decode_inbound, encode_outbound, NEWLINE_MARKER, SPACE_PLACEHOLDER};
pub use display::{TerminalWriter, CALL_DISCONNECTED, GREETING, MENU, TITLE};
pub use engine::{EngineExit, EngineOptions, RelayEngine};
pub use inbound::{handle_event, spawn_event_pump, Disposition, IgnoreReason};
pub use input_loop::{RelayExit, RelayLoop};
pub use keys::{is_tone_key, Command, KeyAction, KeyInterpreter};
pub use selector::{parse_ordinal, ChannelSelector, LegTable, SelectOutcome};
pub use session::{Phase, Role, Session, SessionGuard, SessionState};
