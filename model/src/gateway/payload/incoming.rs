//! Payloads received from the Gateway.

use crate::{guild::UnavailableGuild, id::ApplicationId, user::CurrentUser};
use serde::{Deserialize, Serialize};

/// First payload after connecting.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hello {
    /// Interval in milliseconds at which heartbeats are expected.
    pub heartbeat_interval: u64,
}

/// Dispatched after a successful identify.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Ready {
    #[serde(rename = "v")]
    pub version: u64,
    pub user: CurrentUser,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    pub application: PartialApplication,
}

/// The application fragment carried by `Ready`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PartialApplication {
    pub id: ApplicationId,
}
