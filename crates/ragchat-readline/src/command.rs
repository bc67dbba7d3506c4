use ragchat_core::session::QueryMode;

/// Slash commands understood by the REPL, in completion order.
pub const COMMANDS: &[&str] = &[
    "/mode", "/clear", "/health", "/email", "/topk", "/pdf", "/export", "/transcribe",
    "/history", "/help",
];

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    /// `/mode` with no argument shows the current mode.
    Mode(Option<QueryMode>),
    Clear,
    Health,
    Email(String),
    TopK(u32),
    Pdf,
    Export(Option<String>),
    Transcribe(String),
    History,
    Help,
    Quit,
    /// Malformed command; the message explains the expected usage.
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return Command::Quit;
        }
        if !line.starts_with('/') {
            return Command::Ask(line.to_string());
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match name {
            "/mode" if arg.is_empty() => Command::Mode(None),
            "/mode" => match arg.parse() {
                Ok(mode) => Command::Mode(Some(mode)),
                Err(err) => Command::Invalid(err),
            },
            "/clear" => Command::Clear,
            "/health" => Command::Health,
            "/email" => Command::Email(arg.to_string()),
            "/topk" => match arg.parse() {
                Ok(n) => Command::TopK(n),
                Err(_) => Command::Invalid("Usage: /topk <number>".to_string()),
            },
            "/pdf" => Command::Pdf,
            "/export" if arg.is_empty() => Command::Export(None),
            "/export" => Command::Export(Some(arg.to_string())),
            "/transcribe" if arg.is_empty() => {
                Command::Invalid("Usage: /transcribe <audio file>".to_string())
            }
            "/transcribe" => Command::Transcribe(arg.to_string()),
            "/history" => Command::History,
            "/help" => Command::Help,
            other => Command::Invalid(format!("Unknown command: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_question() {
        assert_eq!(
            Command::parse("  How do I book travel? "),
            Command::Ask("How do I book travel?".to_string())
        );
    }

    #[test]
    fn test_mode_command() {
        assert_eq!(Command::parse("/mode"), Command::Mode(None));
        assert_eq!(
            Command::parse("/mode prep"),
            Command::Mode(Some(QueryMode::Preparation))
        );
        assert!(matches!(Command::parse("/mode turbo"), Command::Invalid(_)));
    }

    #[test]
    fn test_arguments() {
        assert_eq!(Command::parse("/topk 8"), Command::TopK(8));
        assert!(matches!(Command::parse("/topk many"), Command::Invalid(_)));
        assert_eq!(
            Command::parse("/email a@b.co"),
            Command::Email("a@b.co".to_string())
        );
        assert_eq!(
            Command::parse("/export notes.md"),
            Command::Export(Some("notes.md".to_string()))
        );
        assert_eq!(Command::parse("/export"), Command::Export(None));
        assert!(matches!(Command::parse("/transcribe"), Command::Invalid(_)));
    }

    #[test]
    fn test_quit_and_unknown() {
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(
            Command::parse("/frobnicate"),
            Command::Invalid("Unknown command: /frobnicate".to_string())
        );
    }
}
