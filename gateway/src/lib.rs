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

//! Gateway implementation for the Accord ecosystem.
//!
//! A [`Session`] connects to the platform's websocket gateway, identifies or
//! resumes, runs the heartbeat liveness protocol, and dispatches typed
//! events to registered handlers without ever blocking the reader. Close
//! codes are classified into reconnect or fatal outcomes by the session
//! manager.

pub mod compression;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;
pub mod stage;

pub use self::{
    config::{Config, ConfigBuilder},
    error::SessionError,
    handler::Registry,
    session::{Outcome, Session, Signal},
    stage::Stage,
};
pub use accord_model::gateway::Intents;
