//! Parse typed rate limit headers from a response.
//!
//! Parsing response headers is necessary for the [`RateLimiter`] to properly
//! function.
//!
//! [`RateLimiter`]: super::RateLimiter

use std::{
    error::Error,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    str::{self, FromStr, Utf8Error},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A header failed to be parsed.
#[derive(Debug)]
pub struct HeaderParsingError {
    pub(super) kind: HeaderParsingErrorType,
    pub(super) source: Option<Box<dyn Error + Send + Sync>>,
}

impl HeaderParsingError {
    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &HeaderParsingErrorType {
        &self.kind
    }

    /// Consume the error, returning the owned error type and the source error.
    #[must_use = "consuming the error into its parts has no effect if left unused"]
    pub fn into_parts(self) -> (HeaderParsingErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }

    pub(super) fn missing(name: HeaderName) -> Self {
        Self {
            kind: HeaderParsingErrorType::Missing { name },
            source: None,
        }
    }

    pub(super) fn not_utf8(name: HeaderName, value: Vec<u8>, source: Utf8Error) -> Self {
        Self {
            kind: HeaderParsingErrorType::NotUtf8 { name, value },
            source: Some(Box::new(source)),
        }
    }
}

impl Display for HeaderParsingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            HeaderParsingErrorType::Missing { name } => {
                f.write_str("at least one header, '")?;
                f.write_str(name.name())?;

                f.write_str("', is missing")
            }
            HeaderParsingErrorType::NotUtf8 { name, value } => {
                f.write_str("header '")?;
                f.write_str(name.name())?;
                f.write_str("' contains invalid UTF-8: ")?;

                Debug::fmt(value, f)
            }
            HeaderParsingErrorType::Parsing { kind, name, value } => {
                f.write_str("header '")?;
                f.write_str(name.name())?;
                f.write_str("' can not be parsed as a ")?;
                f.write_str(kind.name())?;
                f.write_str(": '")?;
                f.write_str(value)?;

                f.write_str("'")
            }
        }
    }
}

impl Error for HeaderParsingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// Type of [`HeaderParsingError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum HeaderParsingErrorType {
    /// Expected header is missing.
    Missing {
        /// Name of the header that should be present in the list.
        name: HeaderName,
    },
    /// Header value is not UTF-8 valid.
    NotUtf8 {
        /// Name of the header.
        name: HeaderName,
        /// Value of the header.
        value: Vec<u8>,
    },
    /// Header value is not of the expected type.
    Parsing {
        /// Type of header value expected.
        kind: HeaderType,
        /// Name of the header.
        name: HeaderName,
        /// Value of the header.
        value: String,
    },
}

/// Typed name of a rate limit header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum HeaderName {
    /// Opaque identity of the rate limit bucket.
    Bucket,
    /// Whether the rate limit is global.
    Global,
    /// Maximum requests allotted in the bucket.
    Limit,
    /// Remaining requests allotted.
    Remaining,
    /// Epoch time at which the bucket resets.
    Reset,
    /// Seconds until the bucket resets.
    ResetAfter,
    /// Seconds until a request may be retried.
    RetryAfter,
    /// Scope of an encountered limit.
    Scope,
}

impl HeaderName {
    /// Lowercased name for the bucket header.
    pub const BUCKET: &'static str = "x-ratelimit-bucket";

    /// Lowercased name for the global header.
    pub const GLOBAL: &'static str = "x-ratelimit-global";

    /// Lowercased name for the limit header.
    pub const LIMIT: &'static str = "x-ratelimit-limit";

    /// Lowercased name for the remaining header.
    pub const REMAINING: &'static str = "x-ratelimit-remaining";

    /// Lowercased name for the reset header.
    pub const RESET: &'static str = "x-ratelimit-reset";

    /// Lowercased name for the reset-after header.
    pub const RESET_AFTER: &'static str = "x-ratelimit-reset-after";

    /// Lowercased name for the retry-after header.
    // It's correct for this to not have the `x-ratelimit-` prefix; the CDN
    // ban path uses the bare header.
    pub const RETRY_AFTER: &'static str = "retry-after";

    /// Lowercased name for the scope header.
    pub const SCOPE: &'static str = "x-ratelimit-scope";

    /// Lowercased name of the header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bucket => Self::BUCKET,
            Self::Global => Self::GLOBAL,
            Self::Limit => Self::LIMIT,
            Self::Remaining => Self::REMAINING,
            Self::Reset => Self::RESET,
            Self::ResetAfter => Self::RESET_AFTER,
            Self::RetryAfter => Self::RETRY_AFTER,
            Self::Scope => Self::SCOPE,
        }
    }
}

impl Display for HeaderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Expected type of a header value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum HeaderType {
    /// Type of header value is a float.
    Float,
    /// Type of header value is an integer.
    Integer,
    /// Type of header value is a scope string.
    Scope,
}

impl HeaderType {
    const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Scope => "scope",
        }
    }
}

impl Display for HeaderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Scope of an encountered 429 response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RatelimitScope {
    /// The limit applies to every caller at once.
    Global,
    /// The limit applies to the resource across all callers.
    Shared,
    /// The limit applies to the calling user on the route.
    User,
}

impl FromStr for RatelimitScope {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "global" => Self::Global,
            "shared" => Self::Shared,
            "user" => Self::User,
            _ => return Err(()),
        })
    }
}

/// Rate limit applying to every bucket at once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalLimited {
    pub(super) retry_after: f64,
}

impl GlobalLimited {
    /// Seconds before retrying.
    pub const fn retry_after(&self) -> f64 {
        self.retry_after
    }
}

/// Bucket information carried by the response.
#[derive(Clone, Debug, PartialEq)]
pub struct Present {
    pub(super) bucket: Option<Box<str>>,
    pub(super) limit: u64,
    pub(super) remaining: u64,
    /// When the bucket resets, as fractional epoch seconds.
    pub(super) reset: f64,
    /// Seconds until the bucket resets.
    pub(super) reset_after: f64,
    pub(super) global: bool,
    pub(super) scope: Option<RatelimitScope>,
}

impl Present {
    /// Immutable reference to the bucket identity, if the route is limited.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Total number of requests allotted to the bucket.
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Remaining number of requests.
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the response carried the global flag.
    pub const fn is_global(&self) -> bool {
        self.global
    }

    /// Scope of the limit, if the platform sent one.
    pub const fn scope(&self) -> Option<RatelimitScope> {
        self.scope
    }

    /// The absolute instant the window rotates, as server time.
    ///
    /// Computed from the whole seconds of the reset header plus its
    /// fractional part and one extra millisecond, so that a response
    /// arriving exactly on the boundary lands past it despite clock drift.
    pub fn reset_at(&self) -> SystemTime {
        let whole = self.reset.trunc() as u64;
        let frac_ms = (self.reset.fract() * 1_000.).floor() as u64 + 1;

        UNIX_EPOCH + Duration::from_secs(whole) + Duration::from_millis(frac_ms)
    }

    /// Seconds until the window rotates.
    pub fn reset_after(&self) -> Duration {
        Duration::from_secs_f64(self.reset_after.max(0.))
    }
}

/// Parsed rate limit headers.
///
/// The headers of a response may either indicate a global rate limit, a
/// bucketed rate limit, or no rate limit at all.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum RatelimitHeaders {
    /// Rate limit applying to every bucket.
    GlobalLimited(GlobalLimited),
    /// No rate limit headers present; the route is unlimited.
    None,
    /// Bucket information is available.
    Present(Present),
}

impl RatelimitHeaders {
    /// Whether the headers are a global rate limit.
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::GlobalLimited(_))
    }

    /// Whether there are no rate limit headers.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Parse headers from an iterator of name-value pairs.
    ///
    /// Header names must be lowercased; values may be any byte sequence and
    /// are validated before parsing.
    pub fn from_pairs<'a>(
        headers: impl Iterator<Item = (&'a str, &'a [u8])>,
    ) -> Result<Self, HeaderParsingError> {
        let mut bucket = None;
        let mut global = false;
        let mut limit = None;
        let mut remaining = None;
        let mut reset = None;
        let mut reset_after = None;
        let mut retry_after = None;
        let mut scope = None;

        for (name, value) in headers {
            match name {
                HeaderName::BUCKET => {
                    bucket.replace(header_str(HeaderName::Bucket, value)?);
                }
                HeaderName::GLOBAL => {
                    global = value == b"true";
                }
                HeaderName::LIMIT => {
                    limit.replace(header_int(HeaderName::Limit, value)?);
                }
                HeaderName::REMAINING => {
                    remaining.replace(header_int(HeaderName::Remaining, value)?);
                }
                HeaderName::RESET => {
                    reset.replace(header_float(HeaderName::Reset, value)?);
                }
                HeaderName::RESET_AFTER => {
                    reset_after.replace(header_float(HeaderName::ResetAfter, value)?);
                }
                HeaderName::RETRY_AFTER => {
                    retry_after.replace(header_float(HeaderName::RetryAfter, value)?);
                }
                HeaderName::SCOPE => {
                    let text = header_str(HeaderName::Scope, value)?;

                    scope.replace(text.parse().map_err(|()| HeaderParsingError {
                        kind: HeaderParsingErrorType::Parsing {
                            kind: HeaderType::Scope,
                            name: HeaderName::Scope,
                            value: text.to_owned(),
                        },
                        source: None,
                    })?);
                }
                _ => continue,
            }
        }

        if global {
            if let Some(retry_after) = retry_after {
                return Ok(Self::GlobalLimited(GlobalLimited { retry_after }));
            }
        }

        // No values at all means the route is not rate limited.
        if bucket.is_none()
            && limit.is_none()
            && remaining.is_none()
            && reset.is_none()
            && reset_after.is_none()
        {
            return Ok(Self::None);
        }

        Ok(Self::Present(Present {
            // An empty bucket value means the same as an absent one: the
            // route has no server-side limit.
            bucket: bucket.filter(|bucket| !bucket.is_empty()).map(Into::into),
            limit: limit.ok_or_else(|| HeaderParsingError::missing(HeaderName::Limit))?,
            remaining: remaining
                .ok_or_else(|| HeaderParsingError::missing(HeaderName::Remaining))?,
            reset: reset.ok_or_else(|| HeaderParsingError::missing(HeaderName::Reset))?,
            reset_after: reset_after
                .ok_or_else(|| HeaderParsingError::missing(HeaderName::ResetAfter))?,
            global,
            scope,
        }))
    }
}

/// Parse a value expected to be a float.
fn header_float(name: HeaderName, value: &[u8]) -> Result<f64, HeaderParsingError> {
    let text = str::from_utf8(value)
        .map_err(|source| HeaderParsingError::not_utf8(name, value.to_owned(), source))?;

    text.parse().map_err(|source| HeaderParsingError {
        kind: HeaderParsingErrorType::Parsing {
            kind: HeaderType::Float,
            name,
            value: text.to_owned(),
        },
        source: Some(Box::new(source)),
    })
}

/// Parse a value expected to be an integer.
fn header_int(name: HeaderName, value: &[u8]) -> Result<u64, HeaderParsingError> {
    let text = str::from_utf8(value)
        .map_err(|source| HeaderParsingError::not_utf8(name, value.to_owned(), source))?;

    text.parse().map_err(|source| HeaderParsingError {
        kind: HeaderParsingErrorType::Parsing {
            kind: HeaderType::Integer,
            name,
            value: text.to_owned(),
        },
        source: Some(Box::new(source)),
    })
}

/// Parse a value expected to be a UTF-8 valid string.
fn header_str(name: HeaderName, value: &[u8]) -> Result<&str, HeaderParsingError> {
    str::from_utf8(value)
        .map_err(|source| HeaderParsingError::not_utf8(name, value.to_owned(), source))
}

#[cfg(test)]
pub(super) fn test_present(limit: u64, remaining: u64) -> Present {
    Present {
        bucket: Some("test".into()),
        limit,
        remaining,
        reset: 0.,
        reset_after: 1.,
        global: false,
        scope: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{HeaderParsingError, RatelimitHeaders, RatelimitScope};
    use static_assertions::assert_impl_all;
    use std::{error::Error, time::UNIX_EPOCH};

    assert_impl_all!(HeaderParsingError: Error, Send, Sync);
    assert_impl_all!(RatelimitHeaders: Clone, Send, Sync);

    #[test]
    fn global() {
        let headers: [(&str, &[u8]); 2] = [
            ("retry-after", b"65.5"),
            ("x-ratelimit-global", b"true"),
        ];

        let parsed = RatelimitHeaders::from_pairs(headers.into_iter()).unwrap();
        assert!(
            matches!(parsed, RatelimitHeaders::GlobalLimited(g) if (g.retry_after() - 65.5).abs() < f64::EPSILON)
        );
    }

    #[test]
    fn present() {
        let headers: [(&str, &[u8]); 6] = [
            ("x-ratelimit-bucket", b"d721dea6054f6322373d361f98e5c38b"),
            ("x-ratelimit-limit", b"10"),
            ("x-ratelimit-remaining", b"9"),
            ("x-ratelimit-reset", b"1573795260.333"),
            ("x-ratelimit-reset-after", b"10.000"),
            ("x-ratelimit-scope", b"user"),
        ];

        let parsed = RatelimitHeaders::from_pairs(headers.into_iter()).unwrap();

        let present = match parsed {
            RatelimitHeaders::Present(present) => present,
            other => panic!("expected present headers: {other:?}"),
        };

        assert_eq!(9, present.remaining());
        assert_eq!(Some(RatelimitScope::User), present.scope());

        // Whole seconds, plus the fractional part, plus the 1 ms guard. The
        // fractional part rides on float precision, so allow 1 ms of slack.
        let since_epoch = present.reset_at().duration_since(UNIX_EPOCH).unwrap();
        let millis = i64::try_from(since_epoch.as_millis()).unwrap();
        assert!((millis - 1_573_795_260_334).abs() <= 1, "got {millis}");
    }

    #[test]
    fn unlimited_route() {
        let headers: [(&str, &[u8]); 1] = [("content-type", b"application/json")];

        let parsed = RatelimitHeaders::from_pairs(headers.into_iter()).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn empty_bucket_is_no_bucket() {
        let headers: [(&str, &[u8]); 5] = [
            ("x-ratelimit-bucket", b""),
            ("x-ratelimit-limit", b"10"),
            ("x-ratelimit-remaining", b"9"),
            ("x-ratelimit-reset", b"1573795260.333"),
            ("x-ratelimit-reset-after", b"10.000"),
        ];

        let parsed = RatelimitHeaders::from_pairs(headers.into_iter()).unwrap();

        let present = match parsed {
            RatelimitHeaders::Present(present) => present,
            other => panic!("expected present headers: {other:?}"),
        };

        assert_eq!(None, present.bucket());
    }

    #[test]
    fn missing_field_is_an_error() {
        let headers: [(&str, &[u8]); 2] =
            [("x-ratelimit-limit", b"10"), ("x-ratelimit-remaining", b"9")];

        assert!(RatelimitHeaders::from_pairs(headers.into_iter()).is_err());
    }
}
