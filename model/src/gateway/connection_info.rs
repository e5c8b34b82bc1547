//! Connection info returned by the gateway endpoints.

use serde::{Deserialize, Serialize};

/// Current gateway endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConnectionInfo {
    /// URL to connect to.
    pub url: String,
}

/// Current gateway endpoint with bot-scoped connection metadata.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BotConnectionInfo {
    /// URL to connect to.
    pub url: String,
    /// Recommended number of shards.
    pub shards: u64,
}
