//! OutboundNotifier trait definition.

use courier_types::error::DeliveryError;

/// Push-style delivery of a reply to a platform user.
///
/// Delivery happens independently of the inbound request that triggered it.
/// Implementations live in courier-infra (e.g., `LinePushNotifier`).
pub trait OutboundNotifier: Send + Sync {
    /// Human-readable channel name (e.g., "line").
    fn name(&self) -> &str;

    /// Deliver `text` to `user_id`.
    fn push(
        &self,
        user_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}
