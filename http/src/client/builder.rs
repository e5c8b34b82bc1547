use super::{connector, Client, State};
use crate::ratelimiting::{RateLimiter, RateLimiterConfig};
use hyper::{client::Client as HyperClient, header::HeaderMap};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64},
        Arc,
    },
    time::Duration,
};

/// A builder for [`Client`].
#[derive(Debug)]
#[must_use = "has no effect if not built into a Client"]
pub struct ClientBuilder {
    default_headers: Option<HeaderMap>,
    proxy: Option<Box<str>>,
    ratelimiter_config: Option<RateLimiterConfig>,
    timeout: Duration,
    token: Option<Box<str>>,
    use_http: bool,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let http = HyperClient::builder().build(connector::create());

        Client {
            state: Arc::new(State {
                application_id: AtomicU64::new(0),
                default_headers: self.default_headers,
                http,
                proxy: self.proxy,
                ratelimiter: self.ratelimiter_config.map(RateLimiter::new),
                timeout: self.timeout,
                token: self.token,
                token_invalid: AtomicBool::new(false),
                use_http: self.use_http,
            }),
        }
    }

    /// Set headers added to every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);

        self
    }

    /// Route all requests through a proxy host, over plain HTTP.
    ///
    /// Meant for rate-limit-aware proxies that terminate TLS themselves.
    pub fn proxy(mut self, proxy_url: impl Into<String>, use_http: bool) -> Self {
        self.proxy = Some(proxy_url.into().into_boxed_str());
        self.use_http = use_http;

        self
    }

    /// Configure the rate limiter, or pass `None` to disable rate limit
    /// handling entirely (for use behind a limiting proxy).
    pub fn ratelimiter(mut self, config: Option<RateLimiterConfig>) -> Self {
        self.ratelimiter_config = config;

        self
    }

    /// Set the timeout applied to each request, from connect to body.
    ///
    /// Defaults to 10 seconds.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;

        self
    }

    /// Set the token, prefixing it with `Bot ` when no scheme is present.
    pub fn token(mut self, mut token: String) -> Self {
        let is_bot = token.starts_with("Bot ");
        let is_bearer = token.starts_with("Bearer ");

        if !is_bot && !is_bearer {
            token.insert_str(0, "Bot ");
        }

        self.token = Some(token.into_boxed_str());

        self
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            default_headers: None,
            proxy: None,
            ratelimiter_config: Some(RateLimiterConfig::default()),
            timeout: Duration::from_secs(10),
            token: None,
            use_http: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ClientBuilder;

    #[test]
    fn token_is_prefixed() {
        let builder = ClientBuilder::new().token("abc".to_owned());

        assert_eq!(Some("Bot abc"), builder.token.as_deref());
    }

    #[test]
    fn bearer_token_is_kept() {
        let builder = ClientBuilder::new().token("Bearer abc".to_owned());

        assert_eq!(Some("Bearer abc"), builder.token.as_deref());
    }
}
