//! Preferences: config file, terminator grammar, merged settings
//!
//! Precedence is CLI flag over config file over built-in default. The config
//! file is JSON with camelCase keys (`theme`, `historyPath`, `historyDepth`)
//! and is optional: a missing file at the default location is silently
//! ignored, a missing file the operator asked for explicitly is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::TermError;
use crate::theme::Theme;

/// Bytes appended to each transmitted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminator(Vec<u8>);

impl Terminator {
    /// Parse the terminator grammar of the `--terminator` flag.
    ///
    /// `cr`/`\r`/`carriage-return`, `lf`/`\n`, `crlf`/`\r\n`, `none`,
    /// `hex:<HEX>`, anything else literally as UTF-8.
    pub fn parse(value: &str) -> Result<Self, TermError> {
        let bytes = match value.to_ascii_lowercase().as_str() {
            "cr" | "\\r" | "carriage-return" => vec![0x0D],
            "lf" | "\\n" => vec![0x0A],
            "crlf" | "\\r\\n" => vec![0x0D, 0x0A],
            "none" => vec![],
            _ => {
                if let Some(hex) = value.strip_prefix("hex:").or_else(|| value.strip_prefix("HEX:")) {
                    elm_protocol::hex::parse_strict(hex)
                        .map_err(|e| TermError::Terminator(format!("{}: {}", value, e)))?
                } else {
                    value.as_bytes().to_vec()
                }
            }
        };
        Ok(Self(bytes))
    }

    /// The raw bytes to append on send
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Terminator {
    fn default() -> Self {
        Self(vec![0x0D])
    }
}

/// JSON preferences file (`~/.elmterm.json` by default)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    /// Color palette
    pub theme: Option<Theme>,
    /// History file location
    pub history_path: Option<PathBuf>,
    /// Maximum retained history entries
    pub history_depth: Option<usize>,
}

impl FileConfig {
    /// Load preferences from `path`.
    ///
    /// `required` marks a path the operator passed explicitly: then a missing
    /// file is an error, otherwise it yields the defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self, TermError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(TermError::Config {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        serde_json::from_str(&text).map_err(|e| TermError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Fully merged runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Connection URL (`tty://...` or `tcp://...`)
    pub url: String,
    /// Connect timeout
    pub timeout: Duration,
    /// REPL prompt
    pub prompt: String,
    /// Bytes appended on send
    pub terminator: Terminator,
    /// History file location
    pub history_path: PathBuf,
    /// Maximum retained history entries
    pub history_depth: usize,
    /// Color palette
    pub theme: Theme,
    /// Also print hex+ASCII dumps of incoming lines
    pub hexdump: bool,
    /// Disable the analyzer
    pub plain: bool,
    /// Prefix lines with ISO-8601 timestamps
    pub timestamps: bool,
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
