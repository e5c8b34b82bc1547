//! Guilds.

use crate::id::GuildId;
use serde::{Deserialize, Serialize};

/// A guild the current user is in, as carried by `Ready` and guild events.
///
/// The full guild object arrives via `GUILD_CREATE`; the session only needs
/// the id and availability marker.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UnavailableGuild {
    pub id: GuildId,
    #[serde(default)]
    pub unavailable: bool,
}

/// A guild as dispatched by `GUILD_CREATE`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub member_count: Option<u64>,
}
