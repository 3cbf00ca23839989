//! Built-in chat commands handled without calling the model.

/// Reply sent after `/reset`.
pub const RESET_REPLY: &str = "Conversation history cleared.";

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Forget the user's conversation history.
    Reset,
}

/// Parse `text` as a command. Anything unrecognized is a normal message.
pub fn parse_command(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("/reset") {
        Some(Command::Reset)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reset_variants() {
        assert_eq!(parse_command("/reset"), Some(Command::Reset));
        assert_eq!(parse_command("  /RESET \n"), Some(Command::Reset));
    }

    #[test]
    fn test_regular_text_is_not_a_command() {
        assert_eq!(parse_command("reset"), None);
        assert_eq!(parse_command("/reset please"), None);
        assert_eq!(parse_command("Hello"), None);
        assert_eq!(parse_command(""), None);
    }
}
