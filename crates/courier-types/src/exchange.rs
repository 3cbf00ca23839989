//! Exchange types: one inbound message and its single outbound reply.
//!
//! An exchange moves through `Received -> Dispatched -> Completed` or
//! `Received -> Dispatched -> Failed`. Both terminal states carry the text
//! that is pushed back to the user.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Lifecycle state of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeState {
    Received,
    Dispatched,
    Completed,
    Failed,
}

impl ExchangeState {
    /// Whether no further transitions are allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangeState::Completed | ExchangeState::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(self, next: ExchangeState) -> bool {
        matches!(
            (self, next),
            (ExchangeState::Received, ExchangeState::Dispatched)
                | (ExchangeState::Dispatched, ExchangeState::Completed)
                | (ExchangeState::Dispatched, ExchangeState::Failed)
        )
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeState::Received => write!(f, "received"),
            ExchangeState::Dispatched => write!(f, "dispatched"),
            ExchangeState::Completed => write!(f, "completed"),
            ExchangeState::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal payload of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutput {
    /// Text generated by the model (or by a built-in command).
    Reply(String),
    /// Formatted, user-visible error text.
    Error(String),
}

impl ExchangeOutput {
    pub fn text(&self) -> &str {
        match self {
            ExchangeOutput::Reply(text) | ExchangeOutput::Error(text) => text,
        }
    }
}

/// One inbound message and its outcome. Not stored after delivery.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub id: Uuid,
    pub user_id: String,
    pub input_text: String,
    state: ExchangeState,
    output: Option<ExchangeOutput>,
}

impl Exchange {
    /// A freshly accepted inbound message.
    pub fn received(user_id: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            input_text: input_text.into(),
            state: ExchangeState::Received,
            output: None,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn output(&self) -> Option<&ExchangeOutput> {
        self.output.as_ref()
    }

    /// Text to push to the user, once the exchange is terminal.
    pub fn reply_text(&self) -> Option<&str> {
        self.output.as_ref().map(ExchangeOutput::text)
    }

    pub fn mark_dispatched(&mut self) {
        self.advance(ExchangeState::Dispatched);
    }

    pub fn complete(&mut self, output_text: impl Into<String>) {
        self.advance(ExchangeState::Completed);
        self.output = Some(ExchangeOutput::Reply(output_text.into()));
    }

    pub fn fail(&mut self, error_text: impl Into<String>) {
        self.advance(ExchangeState::Failed);
        self.output = Some(ExchangeOutput::Error(error_text.into()));
    }

    fn advance(&mut self, next: ExchangeState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal exchange transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_received_exchange_has_no_output() {
        let exchange = Exchange::received("U1", "Hello");
        assert_eq!(exchange.state(), ExchangeState::Received);
        assert!(exchange.reply_text().is_none());
    }

    #[test]
    fn test_completed_path() {
        let mut exchange = Exchange::received("U1", "Hello");
        exchange.mark_dispatched();
        exchange.complete("Hi there");

        assert_eq!(exchange.state(), ExchangeState::Completed);
        assert!(exchange.state().is_terminal());
        assert_eq!(
            exchange.output(),
            Some(&ExchangeOutput::Reply("Hi there".to_string()))
        );
    }

    #[test]
    fn test_failed_path() {
        let mut exchange = Exchange::received("U1", "Hello");
        exchange.mark_dispatched();
        exchange.fail("error: timed out");

        assert_eq!(exchange.state(), ExchangeState::Failed);
        assert_eq!(exchange.reply_text(), Some("error: timed out"));
    }

    #[test]
    fn test_transition_table() {
        use ExchangeState::*;
        assert!(Received.can_advance_to(Dispatched));
        assert!(Dispatched.can_advance_to(Completed));
        assert!(Dispatched.can_advance_to(Failed));

        assert!(!Received.can_advance_to(Completed));
        assert!(!Completed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Dispatched));
        assert!(!Received.is_terminal());
        assert!(!Dispatched.is_terminal());
    }

    #[test]
    fn test_exchange_ids_are_unique() {
        let a = Exchange::received("U1", "a");
        let b = Exchange::received("U1", "b");
        assert_ne!(a.id, b.id);
    }
}
