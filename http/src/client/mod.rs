mod builder;
mod connector;

pub use self::builder::ClientBuilder;

use crate::{
    api_error::{ApiError, RatelimitedApiError},
    error::{Error, ErrorType, Result},
    ratelimiting::{RateLimiter, RatelimitHeaders, RatelimitScope},
    request::{AttachmentFile, Form, Request},
    routing::Route,
    API_VERSION, HOST,
};
use accord_model::{
    application::InteractionResponse,
    channel::Message,
    gateway::connection_info::{BotConnectionInfo, ConnectionInfo},
    id::{ApplicationId, ChannelId, GuildId, InteractionId, MessageId, UserId, WebhookId},
    user::{CurrentUser, User},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hyper::{
    body::{self, Buf},
    client::Client as HyperClient,
    header::{
        HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, LOCATION,
        RETRY_AFTER, USER_AGENT,
    },
    Body, Method, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{Duration, SystemTime},
};
use tokio::time;

pub(crate) struct State {
    pub(crate) application_id: AtomicU64,
    pub(crate) default_headers: Option<HeaderMap>,
    pub(crate) http: HyperClient<connector::Connector, Body>,
    pub(crate) proxy: Option<Box<str>>,
    pub(crate) ratelimiter: Option<RateLimiter>,
    pub(crate) timeout: Duration,
    pub(crate) token: Option<Box<str>>,
    pub(crate) token_invalid: AtomicBool,
    pub(crate) use_http: bool,
}

impl Debug for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("State")
            .field("default_headers", &self.default_headers)
            .field("proxy", &self.proxy)
            .field("ratelimiter", &self.ratelimiter)
            .field("timeout", &self.timeout)
            .field("use_http", &self.use_http)
            .finish()
    }
}

/// The REST client.
///
/// Almost all methods require authentication; supply a bot token when
/// building the client. Bearer tokens are supported by prefixing the token
/// with `"Bearer "`.
///
/// # Cloning
///
/// The client internally wraps its data within an [`Arc`], so it can be
/// cloned and passed around tasks cheaply.
///
/// # Unauthorized behavior
///
/// When the client encounters an Unauthorized response it takes note that the
/// configured token is invalid and refuses further requests, to avoid
/// platform bans. Create a new client with a new token to recover.
///
/// [`Arc`]: std::sync::Arc
#[derive(Clone, Debug)]
pub struct Client {
    pub(crate) state: std::sync::Arc<State>,
}

impl Client {
    /// Create a new client with a token and default configuration.
    pub fn new(token: impl Into<String>) -> Self {
        ClientBuilder::default().token(token.into()).build()
    }

    /// Create a new builder to configure a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The token used by the client, including its scheme prefix.
    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    /// The application id used by interaction methods, if known.
    pub fn application_id(&self) -> Option<ApplicationId> {
        let id = self.state.application_id.load(Ordering::Relaxed);

        (id != 0).then_some(ApplicationId(id))
    }

    /// Set the application id, returning the previous one if there was one.
    pub fn set_application_id(&self, application_id: ApplicationId) -> Option<ApplicationId> {
        let prev = self
            .state
            .application_id
            .swap(application_id.get(), Ordering::Relaxed);

        (prev != 0).then_some(ApplicationId(prev))
    }

    /// The rate limiter used by the client internally.
    ///
    /// `None` only when rate limit handling was explicitly disabled.
    pub fn ratelimiter(&self) -> Option<&RateLimiter> {
        self.state.ratelimiter.as_ref()
    }

    /// Get the current gateway endpoint.
    pub async fn gateway(&self) -> Result<ConnectionInfo> {
        self.request(Request::new(&Route::GetGateway)).await
    }

    /// Get the current gateway endpoint with bot connection metadata.
    pub async fn gateway_authed(&self) -> Result<BotConnectionInfo> {
        self.request(Request::new(&Route::GetGatewayBot)).await
    }

    /// Get the current user.
    pub async fn current_user(&self) -> Result<CurrentUser> {
        self.request(Request::new(&Route::GetCurrentUser)).await
    }

    /// Get a user by id.
    pub async fn user(&self, user_id: UserId) -> Result<User> {
        self.request(Request::new(&Route::GetUser {
            user_id: user_id.get(),
        }))
        .await
    }

    /// Get a message by channel and id.
    pub async fn message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Message> {
        self.request(Request::new(&Route::GetMessage {
            channel_id: channel_id.get(),
            message_id: message_id.get(),
        }))
        .await
    }

    /// Send a message to a channel, optionally with file attachments.
    pub async fn create_message(
        &self,
        channel_id: ChannelId,
        fields: &CreateMessageFields,
        files: &[AttachmentFile],
    ) -> Result<Message> {
        let route = Route::CreateMessage {
            channel_id: channel_id.get(),
        };

        let request = if files.is_empty() {
            Request::with_json(&route, fields)?
        } else {
            let mut form = Form::new();
            form.payload_json(&serde_json::to_vec(fields).map_err(Error::json)?);

            for file in files {
                form.file(file);
            }

            Request::with_form(&route, form)
        };

        self.request(request).await
    }

    /// Delete a message.
    pub async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<()> {
        self.verify(Request::new(&Route::DeleteMessage {
            channel_id: channel_id.get(),
            message_id: message_id.get(),
        }))
        .await
    }

    /// Fire the typing indicator in a channel.
    pub async fn create_typing_trigger(&self, channel_id: ChannelId) -> Result<()> {
        self.verify(Request::new(&Route::CreateTypingTrigger {
            channel_id: channel_id.get(),
        }))
        .await
    }

    /// Ban a user from a guild.
    pub async fn create_ban(&self, guild_id: GuildId, user_id: UserId) -> Result<()> {
        self.verify(Request::new(&Route::CreateBan {
            guild_id: guild_id.get(),
            user_id: user_id.get(),
        }))
        .await
    }

    /// Remove a ban from a user in a guild.
    pub async fn delete_ban(&self, guild_id: GuildId, user_id: UserId) -> Result<()> {
        self.verify(Request::new(&Route::DeleteBan {
            guild_id: guild_id.get(),
            user_id: user_id.get(),
        }))
        .await
    }

    /// Respond to an interaction.
    ///
    /// The callback route is exempt from the global rate limit bucket.
    pub async fn interaction_callback(
        &self,
        interaction_id: InteractionId,
        interaction_token: impl Into<String>,
        response: &InteractionResponse,
    ) -> Result<()> {
        let route = Route::InteractionCallback {
            interaction_id: interaction_id.get(),
            token: interaction_token.into(),
        };

        self.verify(Request::with_json(&route, response)?).await
    }

    /// Execute a webhook, optionally with file attachments.
    pub async fn execute_webhook(
        &self,
        webhook_id: WebhookId,
        webhook_token: impl Into<String>,
        fields: &CreateMessageFields,
        files: &[AttachmentFile],
    ) -> Result<()> {
        let route = Route::ExecuteWebhook {
            webhook_id: webhook_id.get(),
            token: webhook_token.into(),
        };

        let request = if files.is_empty() {
            Request::with_json(&route, fields)?
        } else {
            let mut form = Form::new();
            form.payload_json(&serde_json::to_vec(fields).map_err(Error::json)?);

            for file in files {
                form.file(file);
            }

            Request::with_form(&route, form)
        };

        self.verify(request).await
    }

    /// Exchange the application's client credentials for a bearer token.
    ///
    /// Authenticates with a Basic header derived from the client id and
    /// secret, as the token endpoint requires.
    pub async fn exchange_client_credentials(
        &self,
        client_id: ApplicationId,
        client_secret: &str,
        scope: &str,
    ) -> Result<TokenResponse> {
        let credentials = BASE64.encode(format!("{client_id}:{client_secret}"));
        let value = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|_| crate::request::unsupported_header("authorization"))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);

        let request = Request::with_form_body(
            &Route::ExchangeClientCredentials,
            &[("grant_type", "client_credentials"), ("scope", scope)],
        )
        .headers(headers);

        self.request(request).await
    }

    /// Execute a request, deserializing the response body.
    pub async fn request<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let resp = self.make_request(request).await?;
        let bytes = aggregate(resp).await?;

        serde_json::from_slice(&bytes).map_err(|source| Error {
            kind: ErrorType::Parsing { body: bytes },
            source: Some(Box::new(source)),
        })
    }

    /// Execute a request, checking only that the response was a success.
    pub async fn verify(&self, request: Request) -> Result<()> {
        self.make_request(request).await?;

        Ok(())
    }

    async fn make_request(&self, request: Request) -> Result<Response<Body>> {
        let resp = self.raw(request).await?;
        let status = resp.status();

        if status.is_success() || status == StatusCode::NO_CONTENT {
            return Ok(resp);
        }

        let bytes = aggregate(resp).await?;

        let error = serde_json::from_slice::<ApiError>(&bytes).map_err(|source| Error {
            kind: ErrorType::Parsing {
                body: bytes.clone(),
            },
            source: Some(Box::new(source)),
        })?;

        Err(Error {
            kind: ErrorType::Response {
                body: bytes,
                error,
                status,
            },
            source: None,
        })
    }

    /// Execute a request, returning the raw response.
    ///
    /// Handles admission against the rate limiter, feeds response headers
    /// back into it, retries 429s and 502s up to the configured cap, and
    /// follows a single redirect.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorType::Unauthorized`] if the configured token has become
    /// invalid due to expiration, revocation, etc.
    pub async fn raw(&self, request: Request) -> Result<Response<Body>> {
        if self.state.token_invalid.load(Ordering::Relaxed) {
            return Err(Error {
                kind: ErrorType::Unauthorized,
                source: None,
            });
        }

        let protocol = if self.state.use_http { "http" } else { "https" };
        let host = self.state.proxy.as_deref().unwrap_or(HOST);
        let url = format!(
            "{protocol}://{host}/api/v{API_VERSION}/{}",
            request.path_str
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %request.method, %url, "sending request");

        let ratelimiter = self.state.ratelimiter.as_ref();
        let mut retries_remaining = ratelimiter.map_or(0, RateLimiter::retries);

        loop {
            let permit = match ratelimiter {
                Some(limiter) => Some(limiter.acquire(request.path.clone()).await),
                None => None,
            };

            let req = self.build_request(&request, &url)?;
            let fut = time::timeout(self.state.timeout, self.state.http.request(req));

            let resp = match fut.await {
                Ok(Ok(resp)) => resp,
                Ok(Err(source)) => {
                    // Transport errors are not retried; the dropped permit
                    // returns its tokens.
                    return Err(Error {
                        kind: ErrorType::RequestError,
                        source: Some(Box::new(source)),
                    });
                }
                Err(source) => {
                    return Err(Error {
                        kind: ErrorType::RequestTimedOut,
                        source: Some(Box::new(source)),
                    });
                }
            };

            if resp.status() == StatusCode::UNAUTHORIZED {
                self.state.token_invalid.store(true, Ordering::Relaxed);
            }

            let rl_headers = parse_ratelimit_headers(resp.headers());
            let date = parse_date(resp.headers());

            if let Some(permit) = permit {
                permit.complete(rl_headers.clone(), date).await;
            }

            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let Some(limiter) = ratelimiter else {
                    return Err(Error {
                        kind: ErrorType::RatelimitExhausted { code: None, status },
                        source: None,
                    });
                };

                // The CDN ban path carries only a bare retry-after header, no
                // JSON body; capture it before the body is consumed.
                let header_retry = resp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<f64>().ok());

                let bytes = aggregate(resp).await?;
                let body = serde_json::from_slice::<RatelimitedApiError>(&bytes).ok();

                let retry_after = body
                    .as_ref()
                    .map(|body| body.retry_after)
                    .or(header_retry)
                    .unwrap_or_default()
                    .max(0.);

                let scope = resolve_scope(&rl_headers, body.as_ref());

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    path = %request.path,
                    ?scope,
                    retry_after,
                    "got 429 response",
                );

                limiter
                    .note_rate_limited(
                        &request.path,
                        scope,
                        Duration::from_secs_f64(retry_after),
                    )
                    .await;

                let policy_allows = !matches!(scope, RatelimitScope::Shared)
                    || limiter.retries_shared();

                if policy_allows && retries_remaining > 0 {
                    retries_remaining -= 1;

                    continue;
                }

                return Err(Error {
                    kind: ErrorType::RatelimitExhausted {
                        code: body.and_then(|body| body.code),
                        status,
                    },
                    source: None,
                });
            }

            if status == StatusCode::BAD_GATEWAY {
                if retries_remaining > 0 {
                    retries_remaining -= 1;

                    continue;
                }

                return Err(Error {
                    kind: ErrorType::ServiceUnavailable,
                    source: None,
                });
            }

            if status.is_redirection() {
                return self.follow_redirect(&request, &resp, protocol, host).await;
            }

            return Ok(resp);
        }
    }

    /// Follow a redirect's location once, with no new admission.
    async fn follow_redirect(
        &self,
        request: &Request,
        resp: &Response<Body>,
        protocol: &str,
        host: &str,
    ) -> Result<Response<Body>> {
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(Error {
                kind: ErrorType::RedirectMissingLocation,
                source: None,
            })?;

        let target = if location.starts_with("http") {
            location.to_owned()
        } else {
            format!("{protocol}://{host}{location}")
        };

        let req = self.build_request(request, &target)?;
        let fut = time::timeout(self.state.timeout, self.state.http.request(req));

        match fut.await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(source)) => Err(Error {
                kind: ErrorType::RequestError,
                source: Some(Box::new(source)),
            }),
            Err(source) => Err(Error {
                kind: ErrorType::RequestTimedOut,
                source: Some(Box::new(source)),
            }),
        }
    }

    fn build_request(&self, request: &Request, url: &str) -> Result<hyper::Request<Body>> {
        let mut builder = hyper::Request::builder()
            .method(request.method.clone())
            .uri(url);

        let user_provided_auth = request
            .headers
            .as_ref()
            .map_or(false, |headers| headers.contains_key(AUTHORIZATION));

        if let Some(headers) = builder.headers_mut() {
            if !user_provided_auth {
                if let Some(token) = self.state.token.as_deref() {
                    let value = HeaderValue::from_str(token).map_err(|source| Error {
                        kind: ErrorType::CreatingHeader {
                            name: AUTHORIZATION.to_string(),
                        },
                        source: Some(Box::new(source)),
                    })?;

                    headers.insert(AUTHORIZATION, value);
                }
            }

            headers.insert(
                USER_AGENT,
                HeaderValue::from_static(concat!(
                    "AccordBot (https://github.com/accord-rs/accord, ",
                    env!("CARGO_PKG_VERSION"),
                    ")",
                )),
            );

            if let Some(form) = &request.form {
                if let Ok(content_type) = HeaderValue::try_from(form.content_type()) {
                    headers.insert(CONTENT_TYPE, content_type);
                }
            } else if request.form_body.is_some() {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
            } else if let Some(bytes) = &request.body {
                headers.insert(CONTENT_LENGTH, bytes.len().into());
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }

            if let Some(req_headers) = &request.headers {
                for (name, value) in req_headers {
                    headers.insert(name, value.clone());
                }
            }

            if let Some(default_headers) = &self.state.default_headers {
                for (name, value) in default_headers {
                    headers.insert(name, value.clone());
                }
            }
        }

        let req = if let Some(form) = &request.form {
            let form_bytes = form.clone().build();

            if let Some(headers) = builder.headers_mut() {
                headers.insert(CONTENT_LENGTH, form_bytes.len().into());
            }

            builder.body(Body::from(form_bytes))
        } else if let Some(bytes) = &request.form_body {
            if let Some(headers) = builder.headers_mut() {
                headers.insert(CONTENT_LENGTH, bytes.len().into());
            }

            builder.body(Body::from(bytes.clone()))
        } else if let Some(bytes) = &request.body {
            builder.body(Body::from(bytes.clone()))
        } else if matches!(
            request.method,
            Method::PUT | Method::POST | Method::PATCH
        ) {
            if let Some(headers) = builder.headers_mut() {
                headers.insert(CONTENT_LENGTH, 0.into());
            }

            builder.body(Body::empty())
        } else {
            builder.body(Body::empty())
        };

        req.map_err(|source| Error {
            kind: ErrorType::BuildingRequest,
            source: Some(Box::new(source)),
        })
    }
}

/// Fields of a message creation payload.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub struct CreateMessageFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
}

/// Bearer token granted by a client credentials exchange.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

/// Parse the rate limit header set, treating malformed headers as absent.
fn parse_ratelimit_headers(headers: &HeaderMap<HeaderValue>) -> RatelimitHeaders {
    let pairs = headers.iter().map(|(key, value)| (key.as_str(), value.as_bytes()));

    match RatelimitHeaders::from_pairs(pairs) {
        Ok(parsed) => parsed,
        Err(_why) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("header parsing failed: {_why:?}");

            RatelimitHeaders::None
        }
    }
}

/// Parse the server `date` header, used for global window inference.
fn parse_date(headers: &HeaderMap<HeaderValue>) -> Option<SystemTime> {
    let value = headers.get(DATE)?.to_str().ok()?;

    httpdate::parse_http_date(value).ok()
}

/// Resolve the scope of a 429 from its headers and body.
fn resolve_scope(
    headers: &RatelimitHeaders,
    body: Option<&RatelimitedApiError>,
) -> RatelimitScope {
    let body_global = body.map_or(false, |body| body.global);

    match headers {
        RatelimitHeaders::GlobalLimited(_) => RatelimitScope::Global,
        RatelimitHeaders::Present(present) => {
            present.scope().unwrap_or(if present.is_global() || body_global {
                RatelimitScope::Global
            } else {
                RatelimitScope::User
            })
        }
        // A 429 with no bucket headers at all is the CDN ban path.
        RatelimitHeaders::None => RatelimitScope::Global,
    }
}

/// Collect a response body into contiguous bytes.
async fn aggregate(resp: Response<Body>) -> Result<Vec<u8>> {
    let mut buf = body::aggregate(resp.into_body())
        .await
        .map_err(|source| Error {
            kind: ErrorType::ChunkingResponse,
            source: Some(Box::new(source)),
        })?;

    let mut bytes = vec![0; buf.remaining()];
    buf.copy_to_slice(&mut bytes);

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::{resolve_scope, CreateMessageFields};
    use crate::{
        api_error::RatelimitedApiError,
        ratelimiting::{RatelimitHeaders, RatelimitScope},
    };

    #[test]
    fn scope_of_bare_429_is_global() {
        assert_eq!(
            RatelimitScope::Global,
            resolve_scope(&RatelimitHeaders::None, None)
        );
    }

    #[test]
    fn scope_prefers_header_over_body() {
        let headers: [(&str, &[u8]); 6] = [
            ("x-ratelimit-bucket", b"abc"),
            ("x-ratelimit-limit", b"5"),
            ("x-ratelimit-remaining", b"0"),
            ("x-ratelimit-reset", b"123.456"),
            ("x-ratelimit-reset-after", b"3.2"),
            ("x-ratelimit-scope", b"shared"),
        ];
        let parsed = RatelimitHeaders::from_pairs(headers.into_iter()).unwrap();
        let body = RatelimitedApiError {
            global: false,
            message: String::new(),
            retry_after: 3.2,
            code: None,
        };

        assert_eq!(RatelimitScope::Shared, resolve_scope(&parsed, Some(&body)));
    }

    #[test]
    fn create_message_skips_unset_fields() {
        let fields = CreateMessageFields {
            content: Some("hi".to_owned()),
            tts: None,
        };

        assert_eq!(
            r#"{"content":"hi"}"#,
            serde_json::to_string(&fields).unwrap()
        );
    }
}
