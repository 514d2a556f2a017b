//! Asterisk Manager Interface client.
//!
//! Only what the relay needs: login, synchronous actions, the channel listing,
//! and a stream of unsolicited events. There is no reconnect; a dropped
//! connection ends the session.

mod client;
mod message;
mod transport;


pub use client::{AmiClient, ListResponse, TransportEvent};
pub use message::{Message, MessageReader};
pub use transport::{
    ActionOutcome, Leg, OutboundAction, Transport, INBOUND_TEXT_EVENT, TDD_RX_OPTIONS,
    TOPOLOGY_EVENTS,
};
