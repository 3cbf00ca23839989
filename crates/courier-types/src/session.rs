//! Conversation session and turn types for Courier.
//!
//! A [`Session`] is the process-lifetime conversational context for one
//! platform user: an ordered, append-only list of role-tagged [`Turn`]s.
//! Turns are only ever appended in (user, model) pairs through
//! [`Session::record_exchange`], so a history never contains half an exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Author of a turn in a conversation.
///
/// Serialized with the role names the generative-language API expects
/// (`user` / `model`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Model => write!(f, "model"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "model" => Ok(TurnRole::Model),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// A single role-tagged message within a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Conversational state for one user.
///
/// Fields are private: the only way to grow the history is
/// [`record_exchange`](Self::record_exchange), which appends a complete
/// (user, model) pair.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: String,
    history: Vec<Turn>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// All turns, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of turns (two per completed exchange).
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Number of completed exchanges.
    pub fn exchange_count(&self) -> usize {
        self.history.len() / 2
    }

    /// Append one completed exchange: the user's input, then the model's output.
    pub fn record_exchange(&mut self, input_text: impl Into<String>, output_text: impl Into<String>) {
        self.history.push(Turn::user(input_text));
        self.history.push(Turn::model(output_text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("U1");
        assert_eq!(session.user_id(), "U1");
        assert!(session.is_empty());
        assert_eq!(session.exchange_count(), 0);
        assert!(session.created_at() <= Utc::now());
    }

    #[test]
    fn test_record_exchange_appends_user_then_model() {
        let mut session = Session::new("U1");
        session.record_exchange("Hello", "Hi there");

        assert_eq!(
            session.history(),
            &[Turn::user("Hello"), Turn::model("Hi there")]
        );
        assert_eq!(session.exchange_count(), 1);
    }

    #[test]
    fn test_history_preserves_order_across_exchanges() {
        let mut session = Session::new("U1");
        session.record_exchange("one", "1");
        session.record_exchange("two", "2");

        let texts: Vec<&str> = session.history().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "1", "two", "2"]);
        assert_eq!(session.len(), 4);
    }

    #[test]
    fn test_turn_role_display_and_parse() {
        assert_eq!(TurnRole::User.to_string(), "user");
        assert_eq!(TurnRole::Model.to_string(), "model");
        assert_eq!("MODEL".parse::<TurnRole>().unwrap(), TurnRole::Model);
        assert!("assistant".parse::<TurnRole>().is_err());
    }

    #[test]
    fn test_turn_role_serde_lowercase() {
        let json = serde_json::to_string(&Turn::model("ok")).unwrap();
        assert_eq!(json, r#"{"role":"model","text":"ok"}"#);
    }
}
