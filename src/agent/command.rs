//! Parsing of one console or voice line into a command
//!
//! Classification order, first match wins:
//! 1. Line starts with the command prefix: slash command
//! 2. First word is the assistant's name: natural action
//! 3. Anything else: free-form query for the model

/// A parsed line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Slash(SlashCommand),
    Natural(NaturalAction),
    Query(String),
}

/// Direct commands behind the prefix character
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    VoiceOn,
    VoiceOff,
    Demo,
    Talk,
    /// Application name, possibly empty
    Open(String),
    Look,
    Help,
    Unknown(String),
}

/// Desktop action requested by name ("saba open notepad")
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NaturalAction {
    Open(String),
    Type(String),
    Click,
    Scroll,
    Search(String),
    Look,
    /// Verb recognised but its required argument is missing
    Incomplete(&'static str),
}

/// Slash keywords shown by `/help`, with a short description
pub const SLASH_HELP: &[(&str, &str)] = &[
    ("amma", "start voice mode (alias: listen)"),
    ("appa", "stop voice mode (alias: mute)"),
    ("demo", "wiggle the mouse cursor"),
    ("talk", "say hello"),
    ("open <app>", "open an application"),
    ("look", "describe what is on screen"),
    ("help", "show this list"),
];

impl Command {
    /// Classify `input` for an assistant called `name`
    pub fn parse(input: &str, prefix: char, name: &str) -> Command {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix(prefix) {
            return Command::Slash(SlashCommand::parse(rest));
        }

        match parse_natural(input, name) {
            Some(action) => Command::Natural(action),
            None => Command::Query(input.to_string()),
        }
    }
}

impl SlashCommand {
    /// Parse the text after the prefix character
    pub fn parse(rest: &str) -> SlashCommand {
        let (keyword, arg) = split_first_word(rest);
        match keyword.to_lowercase().as_str() {
            "amma" | "listen" => SlashCommand::VoiceOn,
            "appa" | "mute" => SlashCommand::VoiceOff,
            "demo" => SlashCommand::Demo,
            "talk" => SlashCommand::Talk,
            "open" => SlashCommand::Open(arg.to_string()),
            "look" => SlashCommand::Look,
            "help" => SlashCommand::Help,
            _ => SlashCommand::Unknown(keyword.to_string()),
        }
    }
}

/// Parse a name-prefixed action phrase
///
/// Returns `None` when the first word is not the name, or when the verb
/// after it is unknown or absent; such lines are ordinary queries.
pub fn parse_natural(input: &str, name: &str) -> Option<NaturalAction> {
    let (first, rest) = split_first_word(input.trim());
    let first = first.trim_end_matches([',', '.', '!', '?', ':']);
    if first.is_empty() || !first.eq_ignore_ascii_case(name) {
        return None;
    }

    let (verb, arg) = split_first_word(rest);
    let verb = verb.trim_end_matches([',', '.', '!', '?', ':']).to_lowercase();

    let needs = |label: &'static str, build: fn(String) -> NaturalAction| {
        if arg.is_empty() {
            NaturalAction::Incomplete(label)
        } else {
            build(arg.to_string())
        }
    };

    let action = match verb.as_str() {
        "open" | "launch" | "start" | "run" => needs("open", NaturalAction::Open),
        "type" => needs("type", NaturalAction::Type),
        "click" => NaturalAction::Click,
        "scroll" => NaturalAction::Scroll,
        "search" => needs("search", NaturalAction::Search),
        "look" => NaturalAction::Look,
        _ => return None,
    };
    Some(action)
}

/// Split off the first whitespace-separated word; the rest is trimmed
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, ""),
    }
}
