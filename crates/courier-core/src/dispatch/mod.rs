//! Inbound message dispatch: commands, redelivery guard and the lane scheduler.

pub mod command;
pub mod dedup;
pub mod worker;

pub use command::{Command, RESET_REPLY, parse_command};
pub use dedup::RedeliveryGuard;
pub use worker::{DispatchReceipt, DispatchSettings, DispatchStats, Dispatcher, format_error_reply};
