use serde_repr::{Deserialize_repr, Serialize_repr};

/// Gateway event op code.
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum OpCode {
    /// A dispatched event.
    Dispatch = 0,
    /// A heartbeat, sent by either side.
    Heartbeat = 1,
    /// Start a new session.
    Identify = 2,
    /// Resume a disconnected session.
    Resume = 6,
    /// Indication that the client should reconnect.
    Reconnect = 7,
    /// The session is invalid and must be re-identified or resumed.
    InvalidSession = 9,
    /// First payload after connecting, carrying the heartbeat interval.
    Hello = 10,
    /// Acknowledgement of a sent heartbeat.
    HeartbeatAck = 11,
}

impl OpCode {
    /// Resolve a raw op code number.
    pub const fn from_repr(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::OpCode;
    use serde_test::{assert_tokens, Token};

    #[test]
    fn variants() {
        assert_tokens(&OpCode::Dispatch, &[Token::U8(0)]);
        assert_tokens(&OpCode::Heartbeat, &[Token::U8(1)]);
        assert_tokens(&OpCode::Identify, &[Token::U8(2)]);
        assert_tokens(&OpCode::Resume, &[Token::U8(6)]);
        assert_tokens(&OpCode::Reconnect, &[Token::U8(7)]);
        assert_tokens(&OpCode::InvalidSession, &[Token::U8(9)]);
        assert_tokens(&OpCode::Hello, &[Token::U8(10)]);
        assert_tokens(&OpCode::HeartbeatAck, &[Token::U8(11)]);
        assert_eq!(None, OpCode::from_repr(3));
    }
}
