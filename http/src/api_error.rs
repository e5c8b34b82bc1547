//! Typed errors returned in platform API response bodies.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Error code of a platform API error body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// General error (such as a malformed request body, amongst other things).
    GeneralError,
    /// Unknown account.
    UnknownAccount,
    /// Unknown application.
    UnknownApplication,
    /// Unknown channel.
    UnknownChannel,
    /// Unknown guild.
    UnknownGuild,
    /// Unknown member.
    UnknownMember,
    /// Unknown message.
    UnknownMessage,
    /// Unknown interaction.
    UnknownInteraction,
    /// Bots cannot use this endpoint.
    BotsCannotUseEndpoint,
    /// Missing access.
    MissingAccess,
    /// Invalid authentication token provided.
    InvalidAuthToken,
    /// You are being rate limited.
    RateLimited,
    /// A code that isn't in the mapped set.
    Other(u64),
}

impl ErrorCode {
    pub const fn num(self) -> u64 {
        match self {
            Self::GeneralError => 0,
            Self::UnknownAccount => 10001,
            Self::UnknownApplication => 10002,
            Self::UnknownChannel => 10003,
            Self::UnknownGuild => 10004,
            Self::UnknownMember => 10007,
            Self::UnknownMessage => 10008,
            Self::UnknownInteraction => 10062,
            Self::BotsCannotUseEndpoint => 20001,
            Self::MissingAccess => 50001,
            Self::InvalidAuthToken => 50014,
            Self::RateLimited => 20022,
            Self::Other(code) => code,
        }
    }
}

impl From<u64> for ErrorCode {
    fn from(code: u64) -> Self {
        match code {
            0 => Self::GeneralError,
            10001 => Self::UnknownAccount,
            10002 => Self::UnknownApplication,
            10003 => Self::UnknownChannel,
            10004 => Self::UnknownGuild,
            10007 => Self::UnknownMember,
            10008 => Self::UnknownMessage,
            10062 => Self::UnknownInteraction,
            20001 => Self::BotsCannotUseEndpoint,
            50001 => Self::MissingAccess,
            50014 => Self::InvalidAuthToken,
            20022 => Self::RateLimited,
            other => Self::Other(other),
        }
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.num())
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.num(), f)
    }
}

/// Error body returned by the platform on failed requests.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("error code ")?;
        Display::fmt(&self.code, f)?;
        f.write_str(": ")?;

        f.write_str(&self.message)
    }
}

/// Body of a 429 response.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RatelimitedApiError {
    /// Whether the rate limit is a global one.
    #[serde(default)]
    pub global: bool,
    pub message: String,
    /// Seconds until the limit resets. Fractional.
    pub retry_after: f64,
    /// Platform error code, present on API (non-CDN) bans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ErrorCode, RatelimitedApiError};

    #[test]
    fn error_code_mapping() {
        assert_eq!(ErrorCode::UnknownMessage, ErrorCode::from(10008));
        assert_eq!(10008, ErrorCode::UnknownMessage.num());
        assert_eq!(ErrorCode::Other(99999), ErrorCode::from(99999));
    }

    #[test]
    fn api_error_body() {
        let value: ApiError =
            serde_json::from_str(r#"{"code": 50001, "message": "Missing Access"}"#).unwrap();

        assert_eq!(ErrorCode::MissingAccess, value.code);
        assert_eq!("Missing Access", value.message);
    }

    #[test]
    fn ratelimited_body() {
        let value: RatelimitedApiError = serde_json::from_str(
            r#"{"global": true, "message": "You are being rate limited.", "retry_after": 6.457}"#,
        )
        .unwrap();

        assert!(value.global);
        assert!((value.retry_after - 6.457).abs() < f64::EPSILON);
        assert_eq!(None, value.code);
    }
}
