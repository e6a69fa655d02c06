//! Response correlation
//!
//! Decides what an inbound datagram means for a session's outstanding
//! requests. Everything here is pure; the session applies the outcome.

use lifx_core::{Header, Message, MessageType};

/// What a pending request is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// Message types that complete the request
    pub accepts: Vec<MessageType>,
    pub ack_required: bool,
    pub res_required: bool,
}

impl Expectation {
    /// Build the expectation for `message` sent with the given flags
    pub fn for_request(message: &Message, ack_required: bool, res_required: bool) -> Self {
        let mut accepts = Vec::with_capacity(1);
        if res_required {
            if let Some(response) = message.response_type() {
                accepts.push(response);
                // Single-zone ranges are answered with StateZone
                if response == MessageType::MultiZoneStateMultiZone {
                    accepts.push(MessageType::MultiZoneStateZone);
                }
            }
        }
        // An acknowledgement completes the request only when no state reply
        // is coming, or when the request has no state reply at all.
        if accepts.is_empty() && (ack_required || res_required) {
            accepts.push(MessageType::Acknowledgement);
        }

        Self {
            accepts,
            ack_required,
            res_required,
        }
    }

    pub fn accepts(&self, message: &Message) -> bool {
        message.kind().map_or(false, |kind| self.accepts.contains(&kind))
    }
}

/// Outcome of correlating one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Completes the pending request with this sequence
    Resolve,
    /// Intermediate acknowledgement; the request keeps waiting for its reply
    Acknowledged,
    /// Not a reply to anything this session is waiting for
    Unsolicited,
}

/// Correlate a decoded datagram.
///
/// `expectation` is the pending entry under `header.sequence`, if any.
pub fn correlate(
    source: u32,
    header: &Header,
    message: &Message,
    expectation: Option<&Expectation>,
) -> Correlation {
    if header.source != source {
        return Correlation::Unsolicited;
    }

    let Some(expectation) = expectation else {
        return Correlation::Unsolicited;
    };

    if expectation.accepts(message) {
        return Correlation::Resolve;
    }

    if matches!(message, Message::Acknowledgement)
        && expectation.ack_required
        && expectation.res_required
    {
        return Correlation::Acknowledged;
    }

    Correlation::Unsolicited
}

/// Header flags for a request: explicit overrides win, then the default
/// policy. Queries ask for a response; mutations ask for an ack only when
/// someone is waiting for the outcome.
pub fn request_flags(
    message: &Message,
    has_callback: bool,
    ack_override: Option<bool>,
    res_override: Option<bool>,
) -> (bool, bool) {
    let query = message.is_query();
    let ack = ack_override.unwrap_or(!query && has_callback);
    let res = res_override.unwrap_or(query);
    (ack, res)
}
