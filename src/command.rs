//! Slash command parsing.
//!
//! Raw input is classified as either a control command or a chat message.
//! Parsing is total: malformed command input degrades to
//! `Command::Unknown`, never to an error.

/// A recognized control command (or an unrecognized `/...` line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// End the session.
    Exit,
    /// Print the command listing.
    Help,
    /// Clear the screen (handled by the terminal backend before dispatch).
    Clear,
    /// Show conversation history.
    History,
    /// Switch to a named agent.
    Agent(String),
    /// List agents with an open conversation.
    Sessions,
    /// List configured agents.
    Agents,
    /// A `/`-prefixed line that matched no known command.
    Unknown(String),
}

/// One unit of user input: a command or a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Cmd(Command),
    Msg(String),
}

/// Parses one raw input line.
///
/// Blank input is an empty message. Lines not starting with `/` (after
/// trimming) pass through unchanged as messages. Command names are
/// case-insensitive; `/agent` without an argument degrades to `Unknown`.
pub fn parse(raw: &str) -> Input {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Input::Msg(String::new());
    }
    if !trimmed.starts_with('/') {
        return Input::Msg(raw.to_string());
    }

    let body = trimmed[1..].trim();
    let mut parts = body.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_lowercase();
    let rest = parts.next().unwrap_or("").trim();

    let command = match name.as_str() {
        "exit" | "quit" | "q" => Command::Exit,
        "help" | "?" => Command::Help,
        "clear" | "cls" => Command::Clear,
        "history" => Command::History,
        "agent" => {
            if rest.is_empty() {
                Command::Unknown(raw.to_string())
            } else {
                Command::Agent(rest.to_string())
            }
        }
        "sessions" => Command::Sessions,
        "agents" => Command::Agents,
        _ => Command::Unknown(raw.to_string()),
    };

    Input::Cmd(command)
}
