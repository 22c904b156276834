//! Command history with bounded depth and atomic persistence
//!
//! Plain UTF-8 text, one command per line, newest at the end. The file is
//! rewritten atomically (temp file + rename) with only the last
//! `depth` entries on every save, so a crash never leaves a torn file.
//! All file I/O here is best-effort from the caller's point of view:
//! loading a missing file yields an empty history and save errors are
//! reported, not fatal.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Bounded command history
#[derive(Debug)]
pub struct History {
    path: PathBuf,
    depth: usize,
    entries: Vec<String>,
}

impl History {
    /// Load history from `path`, best effort; a missing or unreadable file
    /// yields an empty history.
    pub fn load(path: &Path, depth: usize) -> Self {
        let entries = fs::read_to_string(path)
            .map(|text| {
                let lines: Vec<String> = text
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                let skip = lines.len().saturating_sub(depth);
                lines[skip..].to_vec()
            })
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            depth,
            entries,
        }
    }

    /// Append a command, dropping the oldest entry beyond the depth bound
    pub fn append(&mut self, command: &str) {
        self.entries.push(command.to_string());
        let excess = self.entries.len().saturating_sub(self.depth);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    /// Rewrite the history file atomically with the retained entries
    pub fn save(&self) -> std::io::Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            for entry in &self.entries {
                writeln!(file, "{}", entry)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
