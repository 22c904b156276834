//! Raw-mode line editor
//!
//! Runs on a dedicated OS thread doing blocking one-byte reads from the
//! controlling terminal, which is switched to raw mode for the duration of
//! each read (a drop guard restores it). The editor never writes to the
//! terminal itself: every state change is published as a snapshot to the
//! printer queue, which owns stdout.
//!
//! Key handling: printable ASCII inserts at the cursor, BS/DEL deletes
//! before it, left/right arrows move it, up/down navigate history with a
//! floating unsaved-tail slot, CR or LF commits, Ctrl-C cancels the line,
//! Ctrl-D on an empty buffer signals EOF. Escape sequences are parsed as the
//! three-byte `ESC [ <A|B|C|D>` form; anything else is dropped.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::history::History;
use crate::printer::{EditorSnapshot, OutputMessage};
use crate::session::UserEvent;

/// The command under composition
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    /// Empty buffer with the cursor at column zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in `[0, text.len()]`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Insert a printable character at the cursor
    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.text.remove(self.cursor);
        }
    }

    /// Move the cursor one column left
    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor one column right
    pub fn right(&mut self) {
        if self.cursor < self.text.len() {
            self.cursor += 1;
        }
    }

    /// Replace the whole buffer, cursor at the end
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    /// Take the text out, leaving an empty buffer
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

/// History navigation with a floating slot for the unsaved line
///
/// Up walks from the newest entry backward; Down walks forward and, past the
/// end, restores whatever was being typed before navigation started.
#[derive(Debug)]
pub struct HistoryNav {
    entries: Vec<String>,
    /// Index into `entries` while navigating, `None` at the unsaved tail
    index: Option<usize>,
    /// The in-progress line saved when navigation starts
    draft: String,
}

impl HistoryNav {
    /// Start navigation over a snapshot of history entries (oldest first)
    pub fn new(entries: Vec<String>) -> Self {
        Self {
            entries,
            index: None,
            draft: String::new(),
        }
    }

    /// Move to an older entry; returns the text to show, if any
    pub fn up(&mut self, current: &str) -> Option<&str> {
        let next = match self.index {
            None if self.entries.is_empty() => return None,
            None => {
                self.draft = current.to_string();
                self.entries.len() - 1
            }
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.index = Some(next);
        Some(&self.entries[next])
    }

    /// Move to a newer entry or back to the unsaved tail
    pub fn down(&mut self) -> Option<&str> {
        let i = self.index?;
        if i + 1 < self.entries.len() {
            self.index = Some(i + 1);
            Some(&self.entries[i + 1])
        } else {
            self.index = None;
            Some(&self.draft)
        }
    }
}

/// A decoded keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable ASCII
    Char(char),
    /// CR or LF
    Enter,
    /// BS or DEL
    Backspace,
    /// `ESC [ D`
    Left,
    /// `ESC [ C`
    Right,
    /// `ESC [ A`
    Up,
    /// `ESC [ B`
    Down,
    /// 0x03
    CtrlC,
    /// 0x04
    CtrlD,
    /// Stream closed
    Eof,
    /// Anything unrecognized, dropped
    Other,
}

/// Read and decode one keystroke from a blocking byte source.
pub fn read_key(input: &mut impl Read) -> std::io::Result<Key> {
    let Some(byte) = read_byte(input)? else {
        return Ok(Key::Eof);
    };

    Ok(match byte {
        b'\r' | b'\n' => Key::Enter,
        0x08 | 0x7F => Key::Backspace,
        0x03 => Key::CtrlC,
        0x04 => Key::CtrlD,
        0x1B => {
            // Expect the three-byte CSI form; drop anything else.
            match read_byte(input)? {
                Some(b'[') => match read_byte(input)? {
                    Some(b'A') => Key::Up,
                    Some(b'B') => Key::Down,
                    Some(b'C') => Key::Right,
                    Some(b'D') => Key::Left,
                    Some(_) => Key::Other,
                    None => Key::Eof,
                },
                Some(_) => Key::Other,
                None => Key::Eof,
            }
        }
        0x20..=0x7E => Key::Char(byte as char),
        _ => Key::Other,
    })
}

fn read_byte(input: &mut impl Read) -> std::io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// What a keystroke did to the line being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Buffer or cursor may have changed; keep reading
    Edited,
    /// CR/LF: the line is done
    Committed,
    /// Ctrl-C: drop the line
    Cancelled,
    /// Ctrl-D on an empty buffer or stream end
    EndOfInput,
}

/// Apply one keystroke to the buffer.
pub fn apply_key(buffer: &mut LineBuffer, nav: &mut HistoryNav, key: Key) -> KeyOutcome {
    match key {
        Key::Char(c) => buffer.insert(c),
        Key::Backspace => buffer.backspace(),
        Key::Left => buffer.left(),
        Key::Right => buffer.right(),
        Key::Up => {
            if let Some(text) = nav.up(buffer.text()).map(str::to_string) {
                buffer.set(&text);
            }
        }
        Key::Down => {
            if let Some(text) = nav.down().map(str::to_string) {
                buffer.set(&text);
            }
        }
        Key::Enter => return KeyOutcome::Committed,
        Key::CtrlC => return KeyOutcome::Cancelled,
        Key::CtrlD => {
            if buffer.text().is_empty() {
                return KeyOutcome::EndOfInput;
            }
        }
        Key::Eof => return KeyOutcome::EndOfInput,
        Key::Other => {}
    }
    KeyOutcome::Edited
}

/// Best-effort return to cooked mode; used on every exit path so an
/// abandoned raw-mode read cannot leave the terminal unusable.
pub fn restore_terminal() {
    let _ = crossterm::terminal::disable_raw_mode();
}

/// Raw-mode guard; restores cooked mode when dropped.
struct RawMode;

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Run the editor loop on the calling (dedicated) thread.
///
/// Publishes snapshots to the printer queue and committed lines to the
/// session. Returns when the input stream ends, Ctrl-D is pressed on an
/// empty line, the session goes away, or the shutdown flag is raised.
pub fn run_editor(
    prompt: String,
    history: Arc<RwLock<History>>,
    out_tx: mpsc::Sender<OutputMessage>,
    event_tx: mpsc::Sender<UserEvent>,
    shutdown: Arc<AtomicBool>,
) {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    'lines: while !shutdown.load(Ordering::Relaxed) {
        let mut buffer = LineBuffer::new();
        let mut nav = HistoryNav::new(history.read().entries().to_vec());

        let raw = match RawMode::enable() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cannot enter raw mode: {}", e);
                let _ = event_tx.blocking_send(UserEvent::Eof);
                return;
            }
        };

        publish_snapshot(&out_tx, &prompt, &buffer, true);

        loop {
            let key = match read_key(&mut input) {
                Ok(key) => key,
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    Key::Eof
                }
            };

            match apply_key(&mut buffer, &mut nav, key) {
                KeyOutcome::Edited => publish_snapshot(&out_tx, &prompt, &buffer, true),
                KeyOutcome::Committed => {
                    drop(raw);
                    let line = buffer.take();
                    let _ = out_tx.blocking_send(OutputMessage::Commit {
                        prompt: prompt.clone(),
                        line: line.clone(),
                    });
                    if event_tx.blocking_send(UserEvent::Line(line)).is_err() {
                        return; // session is gone
                    }
                    continue 'lines;
                }
                KeyOutcome::Cancelled => {
                    drop(raw);
                    let _ = out_tx.blocking_send(OutputMessage::Commit {
                        prompt: prompt.clone(),
                        line: format!("{}^C", buffer.text()),
                    });
                    continue 'lines;
                }
                KeyOutcome::EndOfInput => {
                    drop(raw);
                    publish_snapshot(&out_tx, &prompt, &buffer, false);
                    let _ = event_tx.blocking_send(UserEvent::Eof);
                    debug!("editor reached end of input");
                    return;
                }
            }
        }
    }
}

fn publish_snapshot(
    out_tx: &mpsc::Sender<OutputMessage>,
    prompt: &str,
    buffer: &LineBuffer,
    active: bool,
) {
    let _ = out_tx.blocking_send(OutputMessage::Snapshot(EditorSnapshot {
        active,
        prompt: prompt.to_string(),
        buffer: buffer.text().to_string(),
        cursor: buffer.cursor(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn keys(bytes: &[u8]) -> Vec<Key> {
        let mut input = Cursor::new(bytes.to_vec());
        let mut out = Vec::new();
        loop {
            let key = read_key(&mut input).unwrap();
            if key == Key::Eof {
                return out;
            }
            out.push(key);
        }
    }

    #[test]
    fn test_decode_printable_and_enter() {
        assert_eq!(
            keys(b"01\r"),
            vec![Key::Char('0'), Key::Char('1'), Key::Enter]
        );
    }

    #[test]
    fn test_decode_arrows() {
        assert_eq!(
            keys(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn test_decode_unknown_escape_dropped() {
        assert_eq!(keys(b"\x1b[Zx"), vec![Key::Other, Key::Char('x')]);
        assert_eq!(keys(b"\x1bOx"), vec![Key::Other, Key::Char('x')]);
    }

    #[test]
    fn test_decode_control_bytes() {
        assert_eq!(
            keys(b"\x03\x04\x08\x7f"),
            vec![Key::CtrlC, Key::CtrlD, Key::Backspace, Key::Backspace]
        );
    }

    #[test]
    fn test_buffer_insert_and_backspace() {
        let mut buffer = LineBuffer::new();
        for c in "010C".chars() {
            buffer.insert(c);
        }
        assert_eq!(buffer.text(), "010C");
        buffer.backspace();
        assert_eq!(buffer.text(), "010");
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn test_buffer_cursor_editing() {
        let mut buffer = LineBuffer::new();
        buffer.set("00");
        buffer.left();
        buffer.insert('1');
        assert_eq!(buffer.text(), "010");
        assert_eq!(buffer.cursor(), 2);
        buffer.right();
        buffer.insert('0');
        assert_eq!(buffer.text(), "0100");
        // Movement is clamped at both ends.
        for _ in 0..10 {
            buffer.right();
        }
        assert_eq!(buffer.cursor(), 4);
        for _ in 0..10 {
            buffer.left();
        }
        assert_eq!(buffer.cursor(), 0);
        buffer.backspace(); // nothing before the cursor
        assert_eq!(buffer.text(), "0100");
    }

    #[test]
    fn test_history_navigation_with_draft() {
        let mut nav = HistoryNav::new(vec!["ATZ".into(), "0100".into()]);
        assert_eq!(nav.up("010"), Some("0100"));
        assert_eq!(nav.up("0100"), Some("ATZ"));
        assert_eq!(nav.up("ATZ"), None); // at the oldest entry
        assert_eq!(nav.down(), Some("0100"));
        // Past the newest entry the unsaved draft comes back.
        assert_eq!(nav.down(), Some("010"));
        assert_eq!(nav.down(), None);
    }

    #[test]
    fn test_history_navigation_empty() {
        let mut nav = HistoryNav::new(vec![]);
        assert_eq!(nav.up(""), None);
        assert_eq!(nav.down(), None);
    }

    #[test]
    fn test_apply_key_commit_and_eof() {
        let mut buffer = LineBuffer::new();
        let mut nav = HistoryNav::new(vec![]);
        assert_eq!(
            apply_key(&mut buffer, &mut nav, Key::Char('A')),
            KeyOutcome::Edited
        );
        assert_eq!(
            apply_key(&mut buffer, &mut nav, Key::Enter),
            KeyOutcome::Committed
        );
        // Ctrl-D only means EOF on an empty buffer.
        assert_eq!(
            apply_key(&mut buffer, &mut nav, Key::CtrlD),
            KeyOutcome::Edited
        );
        buffer.take();
        assert_eq!(
            apply_key(&mut buffer, &mut nav, Key::CtrlD),
            KeyOutcome::EndOfInput
        );
    }

    #[test]
    fn test_apply_key_history_recall() {
        let mut buffer = LineBuffer::new();
        let mut nav = HistoryNav::new(vec!["010C".into()]);
        apply_key(&mut buffer, &mut nav, Key::Char('x'));
        apply_key(&mut buffer, &mut nav, Key::Up);
        assert_eq!(buffer.text(), "010C");
        assert_eq!(buffer.cursor(), 4);
        apply_key(&mut buffer, &mut nav, Key::Down);
        assert_eq!(buffer.text(), "x");
    }
}
