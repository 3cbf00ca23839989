//! Per-user conversational session storage.

pub mod store;

pub use store::{RetentionPolicy, SessionHandle, SessionStore};
