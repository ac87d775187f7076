//! Clubledger - membership dues and payment reconciliation backend
//!
//! The core of this crate is the payment-event reconciliation engine:
//! webhook events from the payment processor are verified, deduplicated,
//! and folded into a per-account transaction ledger and derived balance,
//! exactly once per real-world financial event.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
