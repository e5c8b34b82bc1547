//! Payloads exchanged over the Gateway.

pub mod incoming;
pub mod outgoing;

use crate::gateway::OpCode;
use serde::Deserialize;
use serde_json::value::RawValue;

/// The framed envelope every gateway payload is carried in.
///
/// `d` is kept raw so the reader can dispatch on `(op, s, t)` without paying
/// for a full deserialization of the event data up front.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Op code of the payload.
    pub op: u8,
    /// Sequence number, present on dispatches.
    #[serde(default)]
    pub s: Option<u64>,
    /// Dispatch event name.
    #[serde(default)]
    pub t: Option<String>,
    /// Raw event data.
    #[serde(default)]
    pub d: Option<Box<RawValue>>,
}

impl Envelope {
    /// Parse an envelope from a complete JSON frame.
    pub fn from_json(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }

    /// The resolved op code, if known.
    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_repr(self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::Envelope;
    use crate::gateway::OpCode;

    #[test]
    fn scan_leaves_data_raw() {
        let envelope =
            Envelope::from_json(br#"{"op":0,"s":3,"t":"MESSAGE_CREATE","d":{"a":1}}"#).unwrap();

        assert_eq!(Some(OpCode::Dispatch), envelope.op());
        assert_eq!(Some(3), envelope.s);
        assert_eq!(Some("MESSAGE_CREATE"), envelope.t.as_deref());
        assert_eq!(r#"{"a":1}"#, envelope.d.unwrap().get());
    }

    #[test]
    fn hello_has_no_sequence() {
        let envelope = Envelope::from_json(br#"{"op":10,"d":{"heartbeat_interval":45000}}"#).unwrap();

        assert_eq!(Some(OpCode::Hello), envelope.op());
        assert_eq!(None, envelope.s);
        assert_eq!(None, envelope.t);
    }
}
