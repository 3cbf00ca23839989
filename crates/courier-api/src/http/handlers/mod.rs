//! HTTP request handlers.

pub mod stats;
pub mod webhook;
