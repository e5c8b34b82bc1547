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

//! REST API client for the Accord ecosystem.
//!
//! The client pairs a request executor with a rate limit engine: admission is
//! decided against a process-wide global bucket and a family of per-route
//! buckets discovered from response headers, 429s are honored and retried up
//! to a configured cap, and the wire send itself runs with no locks held.

pub mod api_error;
pub mod client;
pub mod error;
pub mod ratelimiting;
pub mod request;
pub mod routing;

pub use self::{
    client::{Client, ClientBuilder},
    error::{Error, ErrorType, Result},
};

/// Platform API version used by this crate.
pub const API_VERSION: u8 = 10;

/// Host of the platform API.
pub const HOST: &str = "accord.chat";

#[cfg(not(feature = "rustls-native-roots"))]
compile_error!("the `rustls-native-roots` feature must be enabled.");
