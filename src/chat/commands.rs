//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to inspect the chat without sending messages to the model.

/// A parsed chat command.
///
/// These commands are handled locally and are never sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (message counts, model, session state).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Print the transcript, as JSON when `json` is set.
    Transcript { json: bool },

    /// Render the chat as HTML to the given path.
    Html(String),

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use gemini_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/html chat.html").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "transcript" => match argument {
            None => ChatCommand::Transcript { json: false },
            Some(arg) if arg.eq_ignore_ascii_case("json") => ChatCommand::Transcript { json: true },
            Some(_) => ChatCommand::Invalid("/transcript accepts only 'json'".to_string()),
        },
        "html" => match argument {
            Some(path) => ChatCommand::Html(path.to_string()),
            None => ChatCommand::Invalid("/html requires a file path".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /transcript [json]     Print the conversation (optionally as JSON)
  /html <file>           Render the conversation to an HTML file
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /QUIT  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_transcript() {
        assert_eq!(
            parse_command("/transcript"),
            Some(ChatCommand::Transcript { json: false })
        );
        assert_eq!(
            parse_command("/transcript JSON"),
            Some(ChatCommand::Transcript { json: true })
        );
        assert!(matches!(
            parse_command("/transcript yaml"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("json")
        ));
    }

    #[test]
    fn parse_html() {
        assert_eq!(
            parse_command("/html  out/chat.html "),
            Some(ChatCommand::Html("out/chat.html".to_string()))
        );
        assert_eq!(
            parse_command("/html"),
            Some(ChatCommand::Invalid("/html requires a file path".to_string()))
        );
    }

    #[test]
    fn parse_stats_config_help() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model gemini-2.0-flash"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, Gemini!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("a /quit"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for command in ["/transcript", "/html", "/stats", "/config", "/help", "/quit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
