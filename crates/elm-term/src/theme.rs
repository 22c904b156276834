//! Color palettes for the serialized output path
//!
//! Two palettes, picked by the `--theme` flag or the config file: `light`
//! uses the darker ANSI range so text stays readable on white backgrounds,
//! `dark` uses the bright range. Colors are plain SGR sequences; the printer
//! appends [`Palette::reset`] after every colored span.

use serde::Deserialize;

/// Theme selection, as it appears on the CLI and in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Darker colors for light terminal backgrounds
    #[default]
    Light,
    /// Bright colors for dark terminal backgrounds
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {:?} (expected light or dark)", other)),
        }
    }
}

/// SGR color set used by the session when rendering lines
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    /// Outgoing command annotations
    pub outgoing: &'static str,
    /// Incoming adapter lines
    pub incoming: &'static str,
    /// Annotation detail lines
    pub detail: &'static str,
    /// Status messages (connects, shutdown, history I/O)
    pub status: &'static str,
    /// Protocol warnings (NRC, ISO-TP violations)
    pub warning: &'static str,
    /// Fatal errors
    pub error: &'static str,
    /// Timestamp prefixes and hexdump gutters
    pub dim: &'static str,
    /// Reset sequence
    pub reset: &'static str,
}

impl Palette {
    /// Palette for the given theme
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                outgoing: "\x1b[34m",  // blue
                incoming: "\x1b[30m",  // black
                detail: "\x1b[36m",    // cyan
                status: "\x1b[32m",    // green
                warning: "\x1b[33m",   // yellow
                error: "\x1b[31m",     // red
                dim: "\x1b[90m",
                reset: "\x1b[0m",
            },
            Theme::Dark => Self {
                outgoing: "\x1b[94m",  // bright blue
                incoming: "\x1b[97m",  // bright white
                detail: "\x1b[96m",    // bright cyan
                status: "\x1b[92m",    // bright green
                warning: "\x1b[93m",   // bright yellow
                error: "\x1b[91m",     // bright red
                dim: "\x1b[90m",
                reset: "\x1b[0m",
            },
        }
    }

    /// Palette with every sequence empty, for tests and `NO_COLOR` output
    pub fn plain() -> Self {
        Self {
            outgoing: "",
            incoming: "",
            detail: "",
            status: "",
            warning: "",
            error: "",
            dim: "",
            reset: "",
        }
    }

    /// Wrap `text` in a color span
    pub fn paint(&self, color: &'static str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, self.reset)
        }
    }
}
