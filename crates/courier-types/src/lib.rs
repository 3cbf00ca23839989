//! Shared domain types for Courier.
//!
//! Sessions and turns, exchanges, generation options, relay configuration,
//! and the error taxonomy shared by the core, infrastructure and API crates.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod exchange;
pub mod llm;
pub mod session;
