//! Models used when connecting to the Gateway.

pub mod connection_info;
pub mod event;
pub mod payload;
pub mod presence;

mod close_code;
mod intents;
mod opcode;

pub use self::{close_code::CloseCode, intents::Intents, opcode::OpCode};
