use std::fmt::{Display, Formatter, Result as FmtResult};

/// Gateway close event codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CloseCode {
    /// An unknown error occurred.
    UnknownError,
    /// An invalid op code or payload for an op code was sent.
    UnknownOpCode,
    /// An invalid payload was sent.
    DecodeError,
    /// A payload was sent prior to identifying.
    NotAuthenticated,
    /// An invalid token was sent when identifying.
    AuthenticationFailed,
    /// Multiple identify payloads were sent.
    AlreadyAuthenticated,
    /// An invalid sequence was sent for resuming.
    InvalidSequence,
    /// Too many payloads were sent in a certain amount of time.
    RateLimited,
    /// The session timed out.
    SessionTimedOut,
    /// An invalid shard was sent when identifying.
    InvalidShard,
    /// Sharding is required because there are too many guilds.
    ShardingRequired,
    /// An invalid version for the gateway was sent.
    InvalidApiVersion,
    /// An invalid intent was sent.
    InvalidIntents,
    /// A disallowed intent was sent; it may not be enabled for the
    /// application, or the application may not be approved for it.
    DisallowedIntents,
}

impl CloseCode {
    /// Close code the library itself uses when tearing down a connection it
    /// intends to resume. Recognized as an internal echo by the session.
    pub const RECONNECT: u16 = 4000;

    /// Resolve a raw close code.
    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpCode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSequence,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimedOut,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            _ => return None,
        })
    }

    /// Whether a session receiving the code may reconnect and resume.
    pub const fn can_reconnect(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Human description of the code.
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown error",
            Self::UnknownOpCode => "unknown op code",
            Self::DecodeError => "payload decode error",
            Self::NotAuthenticated => "not authenticated",
            Self::AuthenticationFailed => "authentication failed",
            Self::AlreadyAuthenticated => "already authenticated",
            Self::InvalidSequence => "invalid resume sequence",
            Self::RateLimited => "gateway rate limited",
            Self::SessionTimedOut => "session timed out",
            Self::InvalidShard => "invalid shard",
            Self::ShardingRequired => "sharding required",
            Self::InvalidApiVersion => "invalid API version",
            Self::InvalidIntents => "invalid intents",
            Self::DisallowedIntents => "disallowed intents",
        }
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::CloseCode;

    #[test]
    fn classification() {
        for code in [4000, 4001, 4002, 4003, 4005, 4007, 4008, 4009] {
            assert!(CloseCode::from_code(code).unwrap().can_reconnect(), "{code}");
        }

        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(!CloseCode::from_code(code).unwrap().can_reconnect(), "{code}");
        }

        assert_eq!(None, CloseCode::from_code(4006));
        assert_eq!(None, CloseCode::from_code(1000));
    }
}
