//! Parsing of what the user types at the prompt.

/// Opens and closes multi-line input.
pub const MULTILINE_DELIMITER: &str = "\"\"\"";
pub const EXIT_DIRECTIVE: &str = "/exit";
pub const REMEMBER_DIRECTIVE: &str = "/remember";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// `/exit`, any case.
    Exit,
    /// A line starting with `"""`. Carries the rest of that line.
    MultilineStart(String),
    /// `/remember` on its own: remember the previous turn.
    RememberPrevious,
    /// `/remember` anywhere in a prompt: remember the prompt without the directive.
    RememberInline(String),
    /// Anything else is sent to the model.
    Prompt(String),
}

/// Classify a single line read from the prompt.
pub fn parse(line: &str) -> Command {
    if line.trim_start().starts_with(MULTILINE_DELIMITER) {
        return Command::MultilineStart(line.replace(MULTILINE_DELIMITER, ""));
    }
    parse_prompt(line)
}

/// Classify complete input, single- or multi-line. Never yields
/// [`Command::MultilineStart`].
pub fn parse_prompt(text: &str) -> Command {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    if trimmed.eq_ignore_ascii_case(EXIT_DIRECTIVE) {
        return Command::Exit;
    }
    if trimmed == REMEMBER_DIRECTIVE {
        return Command::RememberPrevious;
    }
    if text.contains(REMEMBER_DIRECTIVE) {
        return Command::RememberInline(text.replace(REMEMBER_DIRECTIVE, "").trim().to_string());
    }
    Command::Prompt(text.to_string())
}

/// `true` for the line that closes multi-line input.
pub fn is_multiline_end(line: &str) -> bool {
    line.trim() == MULTILINE_DELIMITER
}

/// Join the lines of a multi-line block. An empty opening line is dropped.
pub fn join_multiline(first: String, rest: Vec<String>) -> String {
    let mut lines = Vec::with_capacity(rest.len() + 1);
    if !first.trim().is_empty() {
        lines.push(first);
    }
    lines.extend(rest);
    lines.join("\n")
}
