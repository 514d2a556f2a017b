//! The seam between the relay engine and the call-signaling service.

use anyhow::Result;

use super::client::AmiClient;
use super::message::Message;

/// Inbound decoded TDD text.
pub const INBOUND_TEXT_EVENT: &str = "TddRxMsg";

/// Events that mean the set of channels may have changed.
pub const TOPOLOGY_EVENTS: [&str; 3] = ["Newchannel", "Hangup", "DeviceStateChange"];

/// Options passed to `TddRx` when the relay is enabled on a channel.
pub const TDD_RX_OPTIONS: &str = "b(1)s";

const LIST_ACTION: &str = "CoreShowChannels";
const LIST_COMPLETE_EVENT: &str = "CoreShowChannelsComplete";

/// One selectable call leg from a channel listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leg {
    pub channel: String,
    pub duration: String,
    pub caller: String,
    pub called: String,
}

impl Leg {
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            ..Self::default()
        }
    }

    fn from_listing(item: &Message) -> Self {
        Self {
            channel: item.value("Channel").to_string(),
            duration: item.value("Duration").to_string(),
            caller: item.value("CallerIDNum").to_string(),
            called: item.value("ConnectedLineNum").to_string(),
        }
    }
}

/// Actions the relay sends toward the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    EnableRelay { leg: String },
    SendText { leg: String, text: String },
    SendDigit { leg: String, digit: char },
}

impl OutboundAction {
    pub fn verb(&self) -> &'static str {
        match self {
            OutboundAction::EnableRelay { .. } => "enable-relay",
            OutboundAction::SendText { .. } => "send-text",
            OutboundAction::SendDigit { .. } => "send-digit",
        }
    }

    pub fn leg(&self) -> &str {
        match self {
            OutboundAction::EnableRelay { leg }
            | OutboundAction::SendText { leg, .. }
            | OutboundAction::SendDigit { leg, .. } => leg,
        }
    }

    pub fn to_message(&self) -> Message {
        match self {
            OutboundAction::EnableRelay { leg } => Message::action("TddRx")
                .with("Channel", leg.as_str())
                .with("Options", TDD_RX_OPTIONS),
            OutboundAction::SendText { leg, text } => Message::action("TddTx")
                .with("Channel", leg.as_str())
                .with("Message", text.as_str()),
            OutboundAction::SendDigit { leg, digit } => Message::action("PlayDTMF")
                .with("Channel", leg.as_str())
                .with("Digit", digit.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Accepted,
    /// The service answered but refused; carries its reason.
    Refused(String),
}

/// What the relay engine needs from the signaling service.
///
/// `Err` from either method means the service could not be reached at all.
pub trait Transport: Send + Sync {
    fn perform(&self, action: &OutboundAction) -> Result<ActionOutcome>;
    fn list_legs(&self) -> Result<Vec<Leg>>;
}

impl Transport for AmiClient {
    fn perform(&self, action: &OutboundAction) -> Result<ActionOutcome> {
        let response = self.action(action.to_message())?;
        if response.is_success() {
            Ok(ActionOutcome::Accepted)
        } else {
            Ok(ActionOutcome::Refused(response.value("Message").to_string()))
        }
    }

    fn list_legs(&self) -> Result<Vec<Leg>> {
        let list = self.list(Message::action(LIST_ACTION), LIST_COMPLETE_EVENT)?;
        if !list.response.is_success() {
            anyhow::bail!(
                "{LIST_ACTION} refused: {}",
                list.response.value("Message")
            );
        }
        Ok(list.items.iter().map(Leg::from_listing).collect())
    }
}
