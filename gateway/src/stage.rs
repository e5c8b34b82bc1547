//! Utilities for knowing and parsing the current connection stage of a
//! [`Session`].
//!
//! [`Session`]: crate::Session

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Reason for a failure while parsing a value into a [`Stage`].
#[derive(Clone, Debug)]
pub enum StageConversionError {
    /// The integer isn't one that maps to a stage.
    InvalidInteger {
        /// The value that was provided.
        value: u8,
    },
}

impl Display for StageConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::InvalidInteger { value } => write!(f, "The integer {value} is invalid"),
        }
    }
}

impl Error for StageConversionError {}

/// The current connection stage of a [`Session`].
///
/// [`Session`]: crate::Session
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Stage {
    /// The session is fully connected and processing events.
    Connected,
    /// The session is disconnected and will not reconnect on its own.
    Disconnected,
    /// The session is handshaking with the gateway, waiting for `Hello`.
    Handshaking,
    /// The session is identifying to create a new gateway session.
    Identifying,
    /// The session is resuming an existing gateway session.
    Resuming,
}

impl Default for Stage {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Handshaking => "Handshaking",
            Self::Identifying => "Identifying",
            Self::Resuming => "Resuming",
        })
    }
}

impl TryFrom<u8> for Stage {
    type Error = StageConversionError;

    fn try_from(num: u8) -> Result<Self, Self::Error> {
        Ok(match num {
            0 => Self::Connected,
            1 => Self::Disconnected,
            2 => Self::Handshaking,
            3 => Self::Identifying,
            4 => Self::Resuming,
            other => return Err(StageConversionError::InvalidInteger { value: other }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Stage;
    use std::error::Error;

    #[test]
    fn conversion() -> Result<(), Box<dyn Error>> {
        assert_eq!(Stage::Connected, Stage::try_from(0)?);
        assert_eq!(Stage::Disconnected, Stage::try_from(1)?);
        assert_eq!(Stage::Handshaking, Stage::try_from(2)?);
        assert_eq!(Stage::Identifying, Stage::try_from(3)?);
        assert_eq!(Stage::Resuming, Stage::try_from(4)?);
        assert!(Stage::try_from(5).is_err());

        Ok(())
    }

    #[test]
    fn formatting() {
        assert_eq!("Connected", Stage::Connected.to_string());
        assert_eq!("Disconnected", Stage::Disconnected.to_string());
        assert_eq!("Handshaking", Stage::Handshaking.to_string());
        assert_eq!("Identifying", Stage::Identifying.to_string());
        assert_eq!("Resuming", Stage::Resuming.to_string());
    }
}
