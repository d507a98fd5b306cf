//! Job routing engine.
//!
//! Wraps the single-owner [`printrelay_core::relay::Relay`] in a service that
//! serialises every event behind one lock and hands the resulting
//! deliveries to the WebSocket transport.

pub mod relay;

pub use relay::RelayService;
