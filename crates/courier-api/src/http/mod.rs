//! HTTP layer: the LINE webhook, health check and stats.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
