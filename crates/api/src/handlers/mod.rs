//! HTTP handlers for the relay's REST surface.

pub mod agents;
pub mod print;
