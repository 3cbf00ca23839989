//! Infrastructure layer for Courier.
//!
//! Implements the ports defined in `courier-core` against real services:
//! the Gemini REST API (`GenerativeModel`) and the LINE Messaging API
//! (`OutboundNotifier`, webhook signature and payload handling). Also loads
//! configuration and secrets.

pub mod config;
pub mod line;
pub mod llm;
pub mod secret;
