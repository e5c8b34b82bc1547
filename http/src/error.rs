use crate::api_error::ApiError;
use hyper::StatusCode;
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    result::Result as StdResult,
};

pub type Result<T, E = Error> = StdResult<T, E>;

/// Error executing a request against the platform API.
#[derive(Debug)]
pub struct Error {
    pub(crate) kind: ErrorType,
    pub(crate) source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &ErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    #[must_use = "consuming the error and retrieving the source has no effect if left unused"]
    pub fn into_source(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source error.
    #[must_use = "consuming the error into its parts has no effect if left unused"]
    pub fn into_parts(self) -> (ErrorType, Option<Box<dyn StdError + Send + Sync>>) {
        (self.kind, self.source)
    }

    pub(crate) fn json(source: serde_json::Error) -> Self {
        Self {
            kind: ErrorType::Json,
            source: Some(Box::new(source)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ErrorType::BuildingRequest => f.write_str("failed to build the request"),
            ErrorType::ChunkingResponse => f.write_str("chunking the response failed"),
            ErrorType::CreatingHeader { name } => {
                f.write_str("parsing the value for header ")?;
                f.write_str(name)?;

                f.write_str(" failed")
            }
            ErrorType::Json => f.write_str("given value couldn't be serialized"),
            ErrorType::Parsing { body } => {
                f.write_str("response body couldn't be deserialized: ")?;

                f.write_str(&String::from_utf8_lossy(body))
            }
            ErrorType::RatelimitExhausted { status, .. } => {
                f.write_str("rate limit retries exhausted; last status ")?;

                Display::fmt(status, f)
            }
            ErrorType::RedirectMissingLocation => {
                f.write_str("redirect response did not carry a location header")
            }
            ErrorType::RequestError => f.write_str("sending the request failed"),
            ErrorType::RequestTimedOut => f.write_str("request timed out"),
            ErrorType::Response { error, status, .. } => {
                f.write_str("response error: status code ")?;
                Display::fmt(status, f)?;
                f.write_str(", error: ")?;

                Display::fmt(error, f)
            }
            ErrorType::ServiceUnavailable => {
                f.write_str("api may be temporarily unavailable (received a 502)")
            }
            ErrorType::Unauthorized => {
                f.write_str("token in use is invalid, expired, or is revoked")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn StdError + 'static))
    }
}

/// Type of [`Error`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorType {
    BuildingRequest,
    ChunkingResponse,
    CreatingHeader {
        name: String,
    },
    Json,
    Parsing {
        body: Vec<u8>,
    },
    /// All configured retries were consumed on 429 responses.
    RatelimitExhausted {
        /// Platform error code from the response body, if present.
        code: Option<u64>,
        status: StatusCode,
    },
    RedirectMissingLocation,
    RequestError,
    RequestTimedOut,
    Response {
        body: Vec<u8>,
        error: ApiError,
        status: StatusCode,
    },
    /// Upstream gateway error, already retried up to the configured cap.
    ServiceUnavailable,
    /// Token in use has become revoked or is otherwise invalid.
    ///
    /// Recreate the client to configure a new token.
    Unauthorized,
}
