//! Meta commands
//!
//! Lines beginning with `:` are intercepted by the session and never
//! transmitted. Parsing lives here so the grammar is testable on its own;
//! execution stays in the session, which owns the state the commands touch.

/// Number of history entries `:history` prints when no count is given
pub const DEFAULT_HISTORY_COUNT: usize = 20;

/// A parsed meta command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    /// `:help` — print the meta command list
    Help,
    /// `:history [n]` — print the last `n` entries
    History(usize),
    /// `:clear` — clear screen and home the cursor
    Clear,
    /// `:analyzer [on|off]` — enable, disable or toggle annotation
    Analyzer(Option<bool>),
    /// `:save` — persist history immediately
    Save,
    /// `:quit` / `:exit` — request shutdown
    Quit,
}

/// Lines printed by `:help`
pub const HELP_TEXT: &[&str] = &[
    ":help              show this list",
    ":history [n]       show the last n commands (default 20)",
    ":clear             clear the screen",
    ":analyzer [on|off] enable, disable or toggle the analyzer",
    ":save              write the history file now",
    ":quit, :exit       disconnect and exit",
];

impl MetaCommand {
    /// Parse a `:`-prefixed line, case-insensitively.
    ///
    /// Returns `Err` with a user-facing message for unknown commands or bad
    /// arguments.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let rest = line.strip_prefix(':').unwrap_or(line);
        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or("").to_ascii_lowercase();
        let arg = words.next();

        match name.as_str() {
            "help" => Ok(MetaCommand::Help),
            "history" => match arg {
                None => Ok(MetaCommand::History(DEFAULT_HISTORY_COUNT)),
                Some(n) => n
                    .parse::<usize>()
                    .map(MetaCommand::History)
                    .map_err(|_| format!("bad count {:?} for :history", n)),
            },
            "clear" => Ok(MetaCommand::Clear),
            "analyzer" => match arg.map(str::to_ascii_lowercase).as_deref() {
                None => Ok(MetaCommand::Analyzer(None)),
                Some("on") => Ok(MetaCommand::Analyzer(Some(true))),
                Some("off") => Ok(MetaCommand::Analyzer(Some(false))),
                Some(other) => Err(format!("bad argument {:?} for :analyzer", other)),
            },
            "save" => Ok(MetaCommand::Save),
            "quit" | "exit" => Ok(MetaCommand::Quit),
            _ => Err(format!("unknown meta command :{}", name)),
        }
    }
}
