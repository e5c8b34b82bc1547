#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::semicolon_if_nothing_returned
)]
#![deny(
    clippy::all,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    unsafe_code,
    unused
)]

//! Wire models for the Accord ecosystem.
//!
//! Contains the payloads exchanged with the chat platform over both the REST
//! and Gateway APIs: snowflake ids, intent bitflags, gateway op codes and
//! close codes, event payloads, and a minimal set of resource objects.

pub mod application;
pub mod channel;
pub mod gateway;
pub mod guild;
pub mod id;
pub mod user;

#[doc(no_inline)]
pub use self::{
    gateway::{CloseCode, Intents, OpCode},
    id::{ApplicationId, ChannelId, GuildId, MessageId, UserId},
};
