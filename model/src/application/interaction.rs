use crate::{
    channel::Message,
    id::{ApplicationId, ChannelId, GuildId, InteractionId},
    user::User,
};
use serde::{
    de::{Deserializer, Error as DeError, MapAccess, Visitor},
    Deserialize, Serialize,
};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt::{Formatter, Result as FmtResult};

/// Kind of an incoming interaction, as tagged on the wire.
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum InteractionType {
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    ApplicationCommandAutocomplete = 4,
    ModalSubmit = 5,
}

/// Payload received when a user executes an interaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<GuildId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// Data payload of an interaction, one distinct variant per wire type tag.
///
/// The wire carries an untyped `data` object whose shape is determined by the
/// sibling `type` field, so deserialization buffers the object and then
/// resolves it through [`InteractionData::from_value`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InteractionData {
    /// Ping interactions carry no data.
    Ping,
    /// A slash command invocation.
    ApplicationCommand(CommandData),
    /// A component (button, select menu) interaction.
    MessageComponent(ComponentData),
    /// A partial command invocation requesting completions.
    ApplicationCommandAutocomplete(CommandData),
    /// A submitted modal.
    ModalSubmit(ModalData),
}

impl InteractionData {
    /// Resolve a buffered `data` object against the interaction's type tag.
    ///
    /// Total over the closed set of [`InteractionType`] variants.
    pub fn from_value(kind: InteractionType, data: Option<Value>) -> Result<Self, serde_json::Error> {
        let data = match data {
            Some(data) => data,
            None => return Ok(Self::Ping),
        };

        Ok(match kind {
            InteractionType::Ping => Self::Ping,
            InteractionType::ApplicationCommand => {
                Self::ApplicationCommand(serde_json::from_value(data)?)
            }
            InteractionType::MessageComponent => {
                Self::MessageComponent(serde_json::from_value(data)?)
            }
            InteractionType::ApplicationCommandAutocomplete => {
                Self::ApplicationCommandAutocomplete(serde_json::from_value(data)?)
            }
            InteractionType::ModalSubmit => Self::ModalSubmit(serde_json::from_value(data)?),
        })
    }
}

/// Data of a slash command invocation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CommandData {
    pub id: ApplicationId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandDataOption>,
}

/// One provided command option.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CommandDataOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Data of a component interaction.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ComponentData {
    pub custom_id: String,
    pub component_type: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Data of a modal submission.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ModalData {
    pub custom_id: String,
}

/// Response sent to the interaction callback endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl<'de> Deserialize<'de> for Interaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(InteractionVisitor)
    }
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum Field {
    Id,
    ApplicationId,
    Type,
    Data,
    GuildId,
    ChannelId,
    User,
    Token,
    Message,
    #[serde(other)]
    Other,
}

struct InteractionVisitor;

impl<'de> Visitor<'de> for InteractionVisitor {
    type Value = Interaction;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("an interaction object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut id = None;
        let mut application_id = None;
        let mut kind: Option<InteractionType> = None;
        let mut data: Option<Value> = None;
        let mut guild_id = None;
        let mut channel_id = None;
        let mut user = None;
        let mut token = None;
        let mut message = None;

        while let Some(field) = map.next_key()? {
            match field {
                Field::Id => id = Some(map.next_value()?),
                Field::ApplicationId => application_id = Some(map.next_value()?),
                Field::Type => kind = Some(map.next_value()?),
                Field::Data => data = map.next_value()?,
                Field::GuildId => guild_id = map.next_value()?,
                Field::ChannelId => channel_id = map.next_value()?,
                Field::User => user = map.next_value()?,
                Field::Token => token = Some(map.next_value()?),
                Field::Message => message = map.next_value()?,
                Field::Other => {
                    map.next_value::<serde::de::IgnoredAny>()?;
                }
            }
        }

        let kind = kind.ok_or_else(|| DeError::missing_field("type"))?;
        let data = InteractionData::from_value(kind, data).map_err(DeError::custom)?;

        Ok(Interaction {
            id: id.ok_or_else(|| DeError::missing_field("id"))?,
            application_id: application_id
                .ok_or_else(|| DeError::missing_field("application_id"))?,
            kind,
            data: Some(data),
            guild_id,
            channel_id,
            user,
            token: token.ok_or_else(|| DeError::missing_field("token"))?,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Interaction, InteractionData, InteractionType};

    #[test]
    fn command_data_follows_type_tag() {
        let json = r#"{
            "id": "1",
            "application_id": "2",
            "type": 2,
            "data": {"id": "3", "name": "ping"},
            "token": "abc"
        }"#;

        let interaction: Interaction = serde_json::from_str(json).unwrap();

        assert_eq!(InteractionType::ApplicationCommand, interaction.kind);
        assert!(matches!(
            interaction.data,
            Some(InteractionData::ApplicationCommand(ref data)) if data.name == "ping"
        ));
    }

    #[test]
    fn ping_has_no_data() {
        let json = r#"{"id": "1", "application_id": "2", "type": 1, "token": "abc"}"#;

        let interaction: Interaction = serde_json::from_str(json).unwrap();

        assert_eq!(Some(InteractionData::Ping), interaction.data);
    }
}
