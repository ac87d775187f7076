//! Application layer: command handlers wiring domain services to ports.

pub mod handlers;
