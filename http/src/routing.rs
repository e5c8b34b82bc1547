use hyper::Method;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::fmt::{Display, Formatter, Result as FmtResult, Write};

/// A request key: the route identifier plus its major path parameter.
///
/// This is the unit the rate limit engine maps to a bucket. Variants carry
/// the resource id (the server-side scope used for `shared` limits); routes
/// without one carry nothing.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Path {
    ChannelsId(u64),
    ChannelsIdMessages(u64),
    ChannelsIdMessagesId(u64),
    ChannelsIdTyping(u64),
    Gateway,
    GatewayBot,
    GuildsIdBans(u64),
    GuildsIdBansUserId(u64),
    InteractionsIdTokenCallback(u64),
    OauthToken,
    UsersId,
    UsersMe,
    WebhooksIdToken(u64),
    /// The reserved request key of the global bucket.
    Global,
}

impl Path {
    /// The same route with its resource cleared, for default-bucket fallback
    /// and for membership checks that ignore the major parameter.
    pub fn parent(&self) -> Self {
        match self {
            Self::ChannelsId(_) => Self::ChannelsId(0),
            Self::ChannelsIdMessages(_) => Self::ChannelsIdMessages(0),
            Self::ChannelsIdMessagesId(_) => Self::ChannelsIdMessagesId(0),
            Self::ChannelsIdTyping(_) => Self::ChannelsIdTyping(0),
            Self::GuildsIdBans(_) => Self::GuildsIdBans(0),
            Self::GuildsIdBansUserId(_) => Self::GuildsIdBansUserId(0),
            Self::InteractionsIdTokenCallback(_) => Self::InteractionsIdTokenCallback(0),
            Self::WebhooksIdToken(_) => Self::WebhooksIdToken(0),
            other => other.clone(),
        }
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ChannelsId(id) => write!(f, "channels/{id}"),
            Self::ChannelsIdMessages(id) => write!(f, "channels/{id}/messages"),
            Self::ChannelsIdMessagesId(id) => write!(f, "channels/{id}/messages/:id"),
            Self::ChannelsIdTyping(id) => write!(f, "channels/{id}/typing"),
            Self::Gateway => f.write_str("gateway"),
            Self::GatewayBot => f.write_str("gateway/bot"),
            Self::GuildsIdBans(id) => write!(f, "guilds/{id}/bans"),
            Self::GuildsIdBansUserId(id) => write!(f, "guilds/{id}/bans/:id"),
            Self::InteractionsIdTokenCallback(id) => {
                write!(f, "interactions/{id}/:token/callback")
            }
            Self::OauthToken => f.write_str("oauth2/token"),
            Self::UsersId => f.write_str("users/:id"),
            Self::UsersMe => f.write_str("users/@me"),
            Self::WebhooksIdToken(id) => write!(f, "webhooks/{id}/:token"),
            Self::Global => f.write_str("0"),
        }
    }
}

/// An operation against the platform API.
///
/// Each variant statically knows its method, its URL with path parameters
/// filled, and the request key used for rate limiting.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Route {
    CreateBan {
        guild_id: u64,
        user_id: u64,
    },
    CreateMessage {
        channel_id: u64,
    },
    CreateTypingTrigger {
        channel_id: u64,
    },
    DeleteBan {
        guild_id: u64,
        user_id: u64,
    },
    DeleteMessage {
        channel_id: u64,
        message_id: u64,
    },
    ExchangeClientCredentials,
    ExecuteWebhook {
        webhook_id: u64,
        token: String,
    },
    GetCurrentUser,
    GetGateway,
    GetGatewayBot,
    GetMessage {
        channel_id: u64,
        message_id: u64,
    },
    GetUser {
        user_id: u64,
    },
    InteractionCallback {
        interaction_id: u64,
        token: String,
    },
}

impl Route {
    /// HTTP method of the route.
    pub const fn method(&self) -> Method {
        match self {
            Self::CreateBan { .. } | Self::ExecuteWebhook { .. } => Method::PUT,
            Self::CreateMessage { .. }
            | Self::CreateTypingTrigger { .. }
            | Self::ExchangeClientCredentials
            | Self::InteractionCallback { .. } => Method::POST,
            Self::DeleteBan { .. } | Self::DeleteMessage { .. } => Method::DELETE,
            Self::GetCurrentUser
            | Self::GetGateway
            | Self::GetGatewayBot
            | Self::GetMessage { .. }
            | Self::GetUser { .. } => Method::GET,
        }
    }

    /// Request key of the route.
    pub const fn to_path(&self) -> Path {
        match *self {
            Self::CreateBan { guild_id, .. } | Self::DeleteBan { guild_id, .. } => {
                Path::GuildsIdBansUserId(guild_id)
            }
            Self::CreateMessage { channel_id } => Path::ChannelsIdMessages(channel_id),
            Self::CreateTypingTrigger { channel_id } => Path::ChannelsIdTyping(channel_id),
            Self::DeleteMessage { channel_id, .. } | Self::GetMessage { channel_id, .. } => {
                Path::ChannelsIdMessagesId(channel_id)
            }
            Self::ExchangeClientCredentials => Path::OauthToken,
            Self::ExecuteWebhook { webhook_id, .. } => Path::WebhooksIdToken(webhook_id),
            Self::GetCurrentUser => Path::UsersMe,
            Self::GetGateway => Path::Gateway,
            Self::GetGatewayBot => Path::GatewayBot,
            Self::GetUser { .. } => Path::UsersId,
            Self::InteractionCallback { interaction_id, .. } => {
                Path::InteractionsIdTokenCallback(interaction_id)
            }
        }
    }
}

/// Display implementation to write the route's URL path.
impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::CreateBan { guild_id, user_id } | Self::DeleteBan { guild_id, user_id } => {
                f.write_str("guilds/")?;
                Display::fmt(guild_id, f)?;
                f.write_str("/bans/")?;

                Display::fmt(user_id, f)
            }
            Self::CreateMessage { channel_id } => {
                f.write_str("channels/")?;
                Display::fmt(channel_id, f)?;

                f.write_str("/messages")
            }
            Self::CreateTypingTrigger { channel_id } => {
                f.write_str("channels/")?;
                Display::fmt(channel_id, f)?;

                f.write_str("/typing")
            }
            Self::DeleteMessage {
                channel_id,
                message_id,
            }
            | Self::GetMessage {
                channel_id,
                message_id,
            } => {
                f.write_str("channels/")?;
                Display::fmt(channel_id, f)?;
                f.write_str("/messages/")?;

                Display::fmt(message_id, f)
            }
            Self::ExchangeClientCredentials => f.write_str("oauth2/token"),
            Self::ExecuteWebhook { webhook_id, token } => {
                f.write_str("webhooks/")?;
                Display::fmt(webhook_id, f)?;
                f.write_str("/")?;

                write_token(f, token)
            }
            Self::GetCurrentUser => f.write_str("users/@me"),
            Self::GetGateway => f.write_str("gateway"),
            Self::GetGatewayBot => f.write_str("gateway/bot"),
            Self::GetUser { user_id } => {
                f.write_str("users/")?;

                Display::fmt(user_id, f)
            }
            Self::InteractionCallback {
                interaction_id,
                token,
            } => {
                f.write_str("interactions/")?;
                Display::fmt(interaction_id, f)?;
                f.write_str("/")?;
                write_token(f, token)?;

                f.write_str("/callback")
            }
        }
    }
}

/// Percent-encode a token path segment.
fn write_token(f: &mut Formatter<'_>, token: &str) -> FmtResult {
    for part in utf8_percent_encode(token, NON_ALPHANUMERIC) {
        f.write_str(part)?;
    }

    Ok(())
}

/// Build the full path string of a route.
pub(crate) fn route_string(route: &Route) -> String {
    let mut path = String::new();

    // Writing to a String can't fail.
    let _ = write!(path, "{route}");

    path
}

#[cfg(test)]
mod tests {
    use super::{Path, Route};
    use hyper::Method;

    #[test]
    fn path_carries_major_param() {
        let route = Route::CreateMessage { channel_id: 12 };

        assert_eq!(Method::POST, route.method());
        assert_eq!(Path::ChannelsIdMessages(12), route.to_path());
        assert_eq!("channels/12/messages", route.to_string());
    }

    #[test]
    fn parent_clears_resource() {
        assert_eq!(
            Path::ChannelsIdMessages(0),
            Path::ChannelsIdMessages(12).parent()
        );
        assert_eq!(Path::UsersId, Path::UsersId.parent());
    }

    #[test]
    fn interaction_callback_token_is_encoded() {
        let route = Route::InteractionCallback {
            interaction_id: 1,
            token: "a/b c".to_owned(),
        };

        assert_eq!("interactions/1/a%2Fb%20c/callback", route.to_string());
    }
}
