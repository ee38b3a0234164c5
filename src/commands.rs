//! Slash commands for the interactive session

use std::fmt;

/// Commands handled locally instead of being sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    /// List commands
    Help,
    /// Toggle the kill switch
    Kill,
    /// Toggle auto-learning
    Learn,
    /// Show recent memory notes
    Memories,
    /// Show the relay log
    Logs,
    /// Show session state
    Status,
    /// Start a fresh conversation
    Clear,
    /// Exit
    Quit,
}

impl SlashCommand {
    pub fn all() -> &'static [SlashCommand] {
        &[
            SlashCommand::Help,
            SlashCommand::Kill,
            SlashCommand::Learn,
            SlashCommand::Memories,
            SlashCommand::Logs,
            SlashCommand::Status,
            SlashCommand::Clear,
            SlashCommand::Quit,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SlashCommand::Help => "help",
            SlashCommand::Kill => "kill",
            SlashCommand::Learn => "learn",
            SlashCommand::Memories => "memories",
            SlashCommand::Logs => "logs",
            SlashCommand::Status => "status",
            SlashCommand::Clear => "clear",
            SlashCommand::Quit => "quit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SlashCommand::Help => "Show available commands",
            SlashCommand::Kill => "Toggle the emergency kill switch",
            SlashCommand::Learn => "Toggle background memory extraction",
            SlashCommand::Memories => "Show recent memory notes [count]",
            SlashCommand::Logs => "Show the neural relay log [count]",
            SlashCommand::Status => "Show mode, logic balance and switches",
            SlashCommand::Clear => "Clear the conversation (memories are kept)",
            SlashCommand::Quit => "Quit Srishti",
        }
    }

    pub fn parse(name: &str) -> Option<SlashCommand> {
        let name = name.to_lowercase();
        Self::all().iter().find(|cmd| cmd.name() == name).copied()
    }

    /// `/name - description` lines for every command
    pub fn help_text() -> String {
        Self::all()
            .iter()
            .map(|cmd| format!("  {:<10} {}", cmd.to_string(), cmd.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for SlashCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Parsed command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Command(SlashCommand, String),
    Unknown(String),
}

/// Parse `input` as a slash command; `None` for ordinary dialogue input
pub fn parse_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let (cmd_name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match SlashCommand::parse(cmd_name) {
        Some(cmd) => Some(ParsedCommand::Command(cmd, args.to_string())),
        None => Some(ParsedCommand::Unknown(cmd_name.to_string())),
    }
}

/// Count argument for `/memories` and `/logs`, falling back to `default`
pub fn count_arg(args: &str, default: usize) -> usize {
    args.trim().parse().unwrap_or(default)
}
