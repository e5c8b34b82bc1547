//! Dispatched gateway events and their static metadata.

use crate::{
    application::Interaction,
    channel::{Channel, Message, MessageDelete, TypingStart},
    gateway::{payload::incoming::Ready, Intents},
    guild::{Guild, UnavailableGuild},
};
use serde_json::value::RawValue;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Name of a dispatched event.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum EventType {
    ChannelCreate,
    ChannelDelete,
    GuildCreate,
    GuildDelete,
    InteractionCreate,
    MessageCreate,
    MessageDelete,
    MessageUpdate,
    Ready,
    Resumed,
    TypingStart,
}

impl EventType {
    /// The wire name of the event.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::InteractionCreate => "INTERACTION_CREATE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::TypingStart => "TYPING_START",
        }
    }

    /// Resolve a wire event name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "CHANNEL_CREATE" => Self::ChannelCreate,
            "CHANNEL_DELETE" => Self::ChannelDelete,
            "GUILD_CREATE" => Self::GuildCreate,
            "GUILD_DELETE" => Self::GuildDelete,
            "INTERACTION_CREATE" => Self::InteractionCreate,
            "MESSAGE_CREATE" => Self::MessageCreate,
            "MESSAGE_DELETE" => Self::MessageDelete,
            "MESSAGE_UPDATE" => Self::MessageUpdate,
            "READY" => Self::Ready,
            "RESUMED" => Self::Resumed,
            "TYPING_START" => Self::TypingStart,
            _ => return None,
        })
    }

    /// Intents the platform requires before it will dispatch the event.
    pub const fn intents(self) -> Intents {
        match self {
            Self::ChannelCreate | Self::ChannelDelete | Self::GuildCreate | Self::GuildDelete => {
                Intents::GUILDS
            }
            Self::MessageCreate | Self::MessageDelete | Self::MessageUpdate => {
                Intents::from_bits_truncate(
                    Intents::GUILD_MESSAGES.bits() | Intents::DIRECT_MESSAGES.bits(),
                )
            }
            Self::TypingStart => Intents::from_bits_truncate(
                Intents::GUILD_MESSAGE_TYPING.bits() | Intents::DIRECT_MESSAGE_TYPING.bits(),
            ),
            Self::InteractionCreate | Self::Ready | Self::Resumed => Intents::empty(),
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// A dispatched event with its deserialized payload.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    ChannelCreate(Channel),
    ChannelDelete(Channel),
    GuildCreate(Box<Guild>),
    GuildDelete(UnavailableGuild),
    InteractionCreate(Box<Interaction>),
    MessageCreate(Box<Message>),
    MessageDelete(MessageDelete),
    MessageUpdate(Box<Message>),
    Ready(Box<Ready>),
    Resumed,
    TypingStart(TypingStart),
}

impl Event {
    /// The name of the event.
    pub const fn kind(&self) -> EventType {
        match self {
            Self::ChannelCreate(_) => EventType::ChannelCreate,
            Self::ChannelDelete(_) => EventType::ChannelDelete,
            Self::GuildCreate(_) => EventType::GuildCreate,
            Self::GuildDelete(_) => EventType::GuildDelete,
            Self::InteractionCreate(_) => EventType::InteractionCreate,
            Self::MessageCreate(_) => EventType::MessageCreate,
            Self::MessageDelete(_) => EventType::MessageDelete,
            Self::MessageUpdate(_) => EventType::MessageUpdate,
            Self::Ready(_) => EventType::Ready,
            Self::Resumed => EventType::Resumed,
            Self::TypingStart(_) => EventType::TypingStart,
        }
    }

    /// Deserialize an event from its name and raw data.
    pub fn from_parts(kind: EventType, data: &RawValue) -> Result<Self, serde_json::Error> {
        let json = data.get();

        Ok(match kind {
            EventType::ChannelCreate => Self::ChannelCreate(serde_json::from_str(json)?),
            EventType::ChannelDelete => Self::ChannelDelete(serde_json::from_str(json)?),
            EventType::GuildCreate => Self::GuildCreate(serde_json::from_str(json)?),
            EventType::GuildDelete => Self::GuildDelete(serde_json::from_str(json)?),
            EventType::InteractionCreate => Self::InteractionCreate(serde_json::from_str(json)?),
            EventType::MessageCreate => Self::MessageCreate(serde_json::from_str(json)?),
            EventType::MessageDelete => Self::MessageDelete(serde_json::from_str(json)?),
            EventType::MessageUpdate => Self::MessageUpdate(serde_json::from_str(json)?),
            EventType::Ready => Self::Ready(serde_json::from_str(json)?),
            EventType::Resumed => Self::Resumed,
            EventType::TypingStart => Self::TypingStart(serde_json::from_str(json)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, EventType};
    use crate::gateway::Intents;

    #[test]
    fn names_round_trip() {
        for kind in [
            EventType::ChannelCreate,
            EventType::GuildCreate,
            EventType::InteractionCreate,
            EventType::MessageCreate,
            EventType::Ready,
            EventType::Resumed,
            EventType::TypingStart,
        ] {
            assert_eq!(Some(kind), EventType::from_name(kind.name()));
        }

        assert_eq!(None, EventType::from_name("PRESENCE_UPDATE"));
    }

    #[test]
    fn message_events_imply_message_intents() {
        let intents = EventType::MessageCreate.intents();

        assert!(intents.contains(Intents::GUILD_MESSAGES));
        assert!(intents.contains(Intents::DIRECT_MESSAGES));
        assert!(EventType::Ready.intents().is_empty());
    }

    #[test]
    fn parse_dispatch_data() {
        let raw = serde_json::value::RawValue::from_string(
            r#"{"channel_id":"2","user_id":"3","timestamp":5}"#.to_owned(),
        )
        .unwrap();

        let event = Event::from_parts(EventType::TypingStart, &raw).unwrap();

        assert!(matches!(event, Event::TypingStart(typing) if typing.timestamp == 5));
    }
}
