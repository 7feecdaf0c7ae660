//! Stateless command triggers.
//!
//! A command is recognized either by its slash token (`/weather`,
//! `/weather@my_bot Paris`) or by the exact label of a menu button.

use crate::dialogue::DialogueKind;
use crate::types::Keyboard;

/// What a command does when triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Greeting plus the main keyboard.
    Greet,
    /// List of available commands.
    Help,
    /// Send a random image for the query tag.
    RandomImage { query: &'static str },
    /// Enter a dialogue.
    Start(DialogueKind),
}

/// A command token, optional button label and action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Token without the leading slash.
    pub token: &'static str,
    pub label: Option<&'static str>,
    /// Argument synopsis shown in the help text.
    pub usage: &'static str,
    pub description: &'static str,
    pub action: CommandAction,
}

/// A parsed slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub token: &'a str,
    /// Bot username from `/token@bot`, if present.
    pub mention: Option<&'a str>,
    /// Everything after the token, untrimmed.
    pub args: &'a str,
}

/// Split `/token[@bot] [args]` into its parts.
///
/// Returns `None` when the text does not start with a well-formed command.
pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, ""),
    };
    let (token, mention) = match head.split_once('@') {
        Some((token, bot)) => (token, Some(bot)),
        None => (head, None),
    };
    let well_formed = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed(token) || mention.is_some_and(|bot| !well_formed(bot)) {
        return None;
    }
    Some(ParsedCommand {
        token,
        mention,
        args,
    })
}

/// Ordered set of commands.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<CommandDefinition>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The assistant's standard commands.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(CommandDefinition {
            token: "start",
            label: None,
            usage: "",
            description: "start using the assistant",
            action: CommandAction::Greet,
        });
        table.register(CommandDefinition {
            token: "help",
            label: None,
            usage: "",
            description: "list the available commands",
            action: CommandAction::Help,
        });
        table.register(CommandDefinition {
            token: "weather",
            label: Some("Weather 🌦"),
            usage: " <city>",
            description: "current weather in a city",
            action: CommandAction::Start(DialogueKind::Weather),
        });
        table.register(CommandDefinition {
            token: "currency_converter",
            label: Some("Currency converter 💰"),
            usage: " <amount> <from> <to>",
            description: "convert between currencies",
            action: CommandAction::Start(DialogueKind::Currency),
        });
        table.register(CommandDefinition {
            token: "cute_animals",
            label: Some("Cute animals 🐶"),
            usage: "",
            description: "get a cute animal picture",
            action: CommandAction::RandomImage { query: "animal" },
        });
        table.register(CommandDefinition {
            token: "survey",
            label: Some("Polls 📊"),
            usage: "",
            description: "create a poll",
            action: CommandAction::Start(DialogueKind::Poll),
        });
        table
    }

    /// Add a command. Lookups return the first definition that matches.
    pub fn register(&mut self, command: CommandDefinition) {
        self.commands.push(command);
    }

    pub fn by_token(&self, token: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|c| c.token == token)
    }

    pub fn by_label(&self, text: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|c| c.label == Some(text))
    }

    /// Main keyboard built from the button labels.
    pub fn keyboard(&self) -> Keyboard {
        Keyboard::from_labels(self.commands.iter().filter_map(|c| c.label))
    }

    pub fn help_text(&self) -> String {
        let mut text = String::from("Available commands:\n");
        for command in &self.commands {
            text.push_str(&format!(
                "/{}{} - {}\n",
                command.token, command.usage, command.description
            ));
        }
        text
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
