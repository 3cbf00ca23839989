//! Conversation logic for Courier.
//!
//! This crate defines the ports (`GenerativeModel`, `OutboundNotifier`) that
//! the infrastructure layer implements, plus the session store and the
//! dispatcher that ties them together. It depends only on `courier-types`,
//! never on `courier-infra` or any HTTP crate.

pub mod delivery;
pub mod dispatch;
pub mod llm;
pub mod maintenance;
pub mod session;
