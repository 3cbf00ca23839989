//! Outbound reply delivery: the notifier trait and failure hooks.

pub mod hook;
pub mod notifier;

pub use hook::{DeliveryFailureHook, LogDeliveryFailure};
pub use notifier::OutboundNotifier;
