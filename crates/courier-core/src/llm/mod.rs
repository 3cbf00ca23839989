//! Conversational model abstractions for Courier.
//!
//! - `GenerativeModel`: RPITIT trait for concrete model backends
//! - `ConversationClient`: session-aware wrapper enforcing timeouts and
//!   append-on-success history updates

pub mod client;
pub mod provider;

pub use client::ConversationClient;
pub use provider::GenerativeModel;
