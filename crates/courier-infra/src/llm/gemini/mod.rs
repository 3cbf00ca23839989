//! Google Gemini backend.

pub mod client;
pub mod types;

pub use client::GeminiModel;
