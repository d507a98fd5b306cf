//! Connection registry and job-routing engine for the print relay.
//!
//! Everything in this crate is synchronous and single-owner: the transport
//! layer feeds already-parsed events into [`relay::Relay`] one at a time and
//! performs the [`relay::Delivery`] commands it hands back.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod messages;
pub mod registry;
pub mod relay;
pub mod sessions;
pub mod types;
