//! Concrete [`GenerativeModel`](courier_core::llm::GenerativeModel) backends.

pub mod gemini;
