//! Errors surfaced by a session and its manager.

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Error produced by a running session or while connecting one.
#[derive(Debug)]
pub struct SessionError {
    pub(crate) kind: SessionErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl SessionError {
    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &SessionErrorType {
        &self.kind
    }

    /// Consume the error, returning the owned error type and the source error.
    #[must_use = "consuming the error into its parts has no effect if left unused"]
    pub fn into_parts(self) -> (SessionErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }

    pub(crate) fn new(kind: SessionErrorType) -> Self {
        Self { kind, source: None }
    }

    pub(crate) fn with_source(
        kind: SessionErrorType,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            SessionErrorType::Close { code, description } => {
                f.write_str("gateway closed the connection")?;

                if let Some(code) = code {
                    f.write_str(" with code ")?;
                    Display::fmt(code, f)?;
                }

                if let Some(description) = description {
                    f.write_str(": ")?;
                    f.write_str(description)?;
                }

                Ok(())
            }
            SessionErrorType::Connecting { url } => {
                f.write_str("failed to connect to the gateway at `")?;
                f.write_str(url)?;

                f.write_str("`")
            }
            SessionErrorType::Decompressing => f.write_str("a binary frame could not be inflated"),
            SessionErrorType::FetchingGatewayUrl => {
                f.write_str("fetching the gateway endpoint over REST failed")
            }
            SessionErrorType::InvalidSession => {
                f.write_str("the platform rejected the session twice during connect")
            }
            SessionErrorType::Protocol { op } => {
                f.write_str("unexpected op code during handshake: ")?;

                Display::fmt(op, f)
            }
            SessionErrorType::ParsingPayload => {
                f.write_str("a gateway payload could not be parsed")
            }
            SessionErrorType::Sending => {
                f.write_str("the message could not be sent over the socket")
            }
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// Type of [`SessionError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum SessionErrorType {
    /// The gateway closed the connection with a fatal or unknown code.
    Close {
        /// Close code, if one was carried by the frame.
        code: Option<u16>,
        /// Description from the close code table, if the code is known.
        description: Option<&'static str>,
    },
    /// Establishing the websocket connection failed.
    Connecting {
        /// URL that was dialed.
        url: String,
    },
    /// A binary frame failed zlib inflation.
    Decompressing,
    /// The REST call for the gateway endpoint failed.
    FetchingGatewayUrl,
    /// A second `Invalid Session` arrived during one connect call.
    InvalidSession,
    /// A payload arrived that the current stage can not handle.
    Protocol {
        /// The offending op code.
        op: u8,
    },
    /// A frame could not be parsed as a gateway envelope.
    ParsingPayload,
    /// The socket's outbound channel has hung up.
    Sending,
}

/// Error removing a subscriber from the handlers registry.
#[derive(Debug)]
pub struct RemoveHandlerError {
    pub(crate) index: usize,
    pub(crate) len: usize,
}

impl RemoveHandlerError {
    /// Index that was requested for removal.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of subscribers registered for the event at the time.
    pub const fn len(&self) -> usize {
        self.len
    }
}

impl Display for RemoveHandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("handler index ")?;
        Display::fmt(&self.index, f)?;
        f.write_str(" is out of range for ")?;
        Display::fmt(&self.len, f)?;

        f.write_str(" registered handlers")
    }
}

impl Error for RemoveHandlerError {}
