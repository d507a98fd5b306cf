//! Print relay API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! WebSocket transport, routing engine) so integration tests and the binary
//! entrypoint can both access them.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;
