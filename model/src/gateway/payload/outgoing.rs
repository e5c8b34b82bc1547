//! Payloads sent to the Gateway.

use crate::gateway::{presence::UpdatePresence, Intents, OpCode};
use serde::{Deserialize, Serialize};

/// Start a new session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identify {
    pub d: IdentifyInfo,
    pub op: OpCode,
}

impl Identify {
    pub const fn new(info: IdentifyInfo) -> Self {
        Self {
            d: info,
            op: OpCode::Identify,
        }
    }
}

/// Information to use when identifying.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IdentifyInfo {
    pub token: String,
    pub properties: IdentifyProperties,
    pub compress: bool,
    pub large_threshold: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresence>,
    pub intents: Intents,
}

/// Runtime labels reported at identify time.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IdentifyProperties {
    pub browser: String,
    pub device: String,
    pub os: String,
}

impl IdentifyProperties {
    pub fn new(
        browser: impl Into<String>,
        device: impl Into<String>,
        os: impl Into<String>,
    ) -> Self {
        Self {
            browser: browser.into(),
            device: device.into(),
            os: os.into(),
        }
    }
}

/// Resume a disconnected session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Resume {
    pub d: ResumeInfo,
    pub op: OpCode,
}

impl Resume {
    pub fn new(seq: u64, session_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            d: ResumeInfo {
                seq,
                session_id: session_id.into(),
                token: token.into(),
            },
            op: OpCode::Resume,
        }
    }
}

/// Information to use when resuming.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResumeInfo {
    pub seq: u64,
    pub session_id: String,
    pub token: String,
}

/// A heartbeat with the last received sequence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Heartbeat {
    pub d: Option<u64>,
    pub op: OpCode,
}

impl Heartbeat {
    pub const fn new(seq: Option<u64>) -> Self {
        Self {
            d: seq,
            op: OpCode::Heartbeat,
        }
    }
}
