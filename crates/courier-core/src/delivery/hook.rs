//! Hooks invoked when a reply could not be delivered.
//!
//! Delivery failures are terminal for their exchange. The hook is the
//! extension point for alerting or dead-lettering; the default only logs.

use courier_types::error::DeliveryError;
use courier_types::exchange::Exchange;

/// Called once per exchange whose reply could not be pushed, after any
/// configured retries are exhausted. A busy reply dropped for lack of
/// capacity is reported with `attempts == 0`.
pub trait DeliveryFailureHook: Send + Sync {
    fn on_delivery_failure(&self, exchange: &Exchange, error: &DeliveryError, attempts: u32);
}

/// Default hook: log at error level and drop the reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDeliveryFailure;

impl DeliveryFailureHook for LogDeliveryFailure {
    fn on_delivery_failure(&self, exchange: &Exchange, error: &DeliveryError, attempts: u32) {
        tracing::error!(
            exchange_id = %exchange.id,
            user_id = %exchange.user_id,
            state = %exchange.state(),
            attempts,
            error = %error,
            "reply delivery failed, dropping"
        );
    }
}
