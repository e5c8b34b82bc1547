//! Typed requests and the pieces used to build them.

mod multipart;

pub use self::multipart::Form;

use crate::{
    error::{Error, ErrorType, Result},
    routing::{self, Path, Route},
};
use hyper::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Serialize;

/// A single buildable request against the platform API.
#[derive(Debug)]
pub struct Request {
    /// The JSON body of the request, if any.
    pub body: Option<Vec<u8>>,
    /// The URL-encoded form body of the request, if any.
    pub form_body: Option<Vec<u8>>,
    /// The multipart form of the request, if any.
    pub form: Option<Form>,
    /// Extra headers to set on the request, if any.
    pub headers: Option<HeaderMap<HeaderValue>>,
    /// The method of the request.
    pub method: Method,
    /// The rate limiting request key.
    pub path: Path,
    /// The URI path to request.
    pub path_str: String,
}

impl Request {
    /// Create a bodyless request from a route.
    pub fn new(route: &Route) -> Self {
        Self {
            body: None,
            form_body: None,
            form: None,
            headers: None,
            method: route.method(),
            path: route.to_path(),
            path_str: routing::route_string(route),
        }
    }

    /// Create a request with a JSON body.
    pub fn with_json(route: &Route, body: &impl Serialize) -> Result<Self> {
        let mut request = Self::new(route);
        request.body = Some(serde_json::to_vec(body).map_err(Error::json)?);

        Ok(request)
    }

    /// Create a request with a URL-encoded form body.
    pub fn with_form_body(route: &Route, fields: &[(&str, &str)]) -> Self {
        let mut request = Self::new(route);
        request.form_body = Some(urlencode(fields));

        request
    }

    /// Create a request carrying a multipart form.
    pub fn with_form(route: &Route, form: Form) -> Self {
        let mut request = Self::new(route);
        request.form = Some(form);

        request
    }

    /// Attach extra headers to the request.
    pub fn headers(mut self, headers: HeaderMap<HeaderValue>) -> Self {
        self.headers = Some(headers);

        self
    }
}

/// A file to upload alongside a request's JSON payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentFile {
    /// Name of the file as shown to users.
    pub filename: String,
    /// Content type of the file, if known by the caller.
    pub content_type: Option<String>,
    /// Raw bytes of the file.
    pub data: Vec<u8>,
}

impl AttachmentFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());

        self
    }
}

/// Serialize fields as an `application/x-www-form-urlencoded` body.
fn urlencode(fields: &[(&str, &str)]) -> Vec<u8> {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

    let mut buffer = String::new();

    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            buffer.push('&');
        }

        buffer.extend(utf8_percent_encode(name, NON_ALPHANUMERIC));
        buffer.push('=');
        buffer.extend(utf8_percent_encode(value, NON_ALPHANUMERIC));
    }

    buffer.into_bytes()
}

pub(crate) fn unsupported_header(name: &str) -> Error {
    Error {
        kind: ErrorType::CreatingHeader {
            name: name.to_owned(),
        },
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{urlencode, Request};
    use crate::routing::{Path, Route};
    use hyper::Method;

    #[test]
    fn form_body_encoding() {
        let body = urlencode(&[("grant_type", "client_credentials"), ("scope", "a b")]);

        assert_eq!(b"grant%5Ftype=client%5Fcredentials&scope=a%20b".as_slice(), body);
    }

    #[test]
    fn request_from_route() {
        let request = Request::new(&Route::GetGatewayBot);

        assert_eq!(Method::GET, request.method);
        assert_eq!(Path::GatewayBot, request.path);
        assert_eq!("gateway/bot", request.path_str);
        assert!(request.body.is_none());
    }
}
