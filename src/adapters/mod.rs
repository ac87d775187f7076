//! Adapters: concrete implementations of the ports plus the HTTP surface
//! and background jobs.

pub mod http;
pub mod jobs;
pub mod memory;
pub mod postgres;
pub mod stripe;
