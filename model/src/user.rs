//! Users.

use crate::id::UserId;
use serde::{Deserialize, Serialize};

/// A platform user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub discriminator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<bool>,
}

/// The current user, as returned by the identity endpoint and `Ready`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub discriminator: String,
    #[serde(default)]
    pub bot: bool,
}
