//! Snowflake ids for platform resources.
//!
//! The platform serializes ids as strings to avoid integer precision loss in
//! permissive JSON parsers, but accepts either form. The visitor here does
//! the same.

use serde::{
    de::{Deserializer, Error as DeError, Visitor},
    ser::Serializer,
    Deserialize, Serialize,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

macro_rules! snowflake {
    ($(#[$attr:meta] $name:ident;)*) => {
        $(
            #[$attr]
            #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
            pub struct $name(pub u64);

            impl $name {
                /// The id as a raw integer.
                pub const fn get(self) -> u64 {
                    self.0
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                    Display::fmt(&self.0, f)
                }
            }

            impl From<u64> for $name {
                fn from(value: u64) -> Self {
                    Self(value)
                }
            }

            impl Serialize for $name {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(&self.0)
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    deserializer.deserialize_any(SnowflakeVisitor).map(Self)
                }
            }
        )*
    };
}

snowflake! {
    /// Id of an application.
    ApplicationId;
    /// Id of a channel.
    ChannelId;
    /// Id of a guild.
    GuildId;
    /// Id of an interaction.
    InteractionId;
    /// Id of a message.
    MessageId;
    /// Id of a user.
    UserId;
    /// Id of a webhook.
    WebhookId;
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("a snowflake as a string or integer")
    }

    fn visit_u64<E: DeError>(self, value: u64) -> Result<Self::Value, E> {
        Ok(value)
    }

    fn visit_str<E: DeError>(self, value: &str) -> Result<Self::Value, E> {
        value.parse().map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelId, UserId};
    use serde_test::{assert_de_tokens, assert_tokens, Token};

    #[test]
    fn serializes_as_string() {
        assert_tokens(&UserId(114_941_315_417_899_012), &[Token::Str("114941315417899012")]);
    }

    #[test]
    fn deserializes_from_integer() {
        assert_de_tokens(&ChannelId(114), &[Token::U64(114)]);
    }
}
