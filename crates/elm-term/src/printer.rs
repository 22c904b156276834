//! Serialized terminal output
//!
//! The printer task is the only writer to the operator's terminal. It
//! consumes one queue carrying both rendered output lines and line-editor
//! snapshots, so asynchronous adapter traffic can never interleave with the
//! command being edited: before printing it clears the in-progress input
//! line, afterwards it repaints `<prompt><buffer>` and restores the cursor.
//!
//! The terminal is in raw mode while the editor is active, so every line is
//! terminated with CRLF and the input line is repainted with
//! carriage-return + erase-to-end-of-line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Erase from cursor to end of line
const ERASE_LINE: &str = "\r\x1b[K";
/// Clear screen and home the cursor
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// The line editor's published state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSnapshot {
    /// Whether a read is in progress (and the input line must be repainted)
    pub active: bool,
    /// Prompt string
    pub prompt: String,
    /// Command under composition
    pub buffer: String,
    /// Cursor position in `[0, buffer.len()]`
    pub cursor: usize,
}

/// Messages consumed by the printer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMessage {
    /// Rendered lines (colors already applied), printed in order
    Lines(Vec<String>),
    /// New editor state; repaint the input line
    Snapshot(EditorSnapshot),
    /// The edited line was committed: freeze it on screen and move on
    Commit {
        /// Prompt to repaint before the frozen line
        prompt: String,
        /// The committed command text
        line: String,
    },
    /// `ESC [ 2 J  ESC [ H`
    ClearScreen,
    /// Flush and stop
    Shutdown,
}

/// Run the printer over any writer (stdout in production, a buffer in tests).
pub async fn run_printer<W>(mut rx: mpsc::Receiver<OutputMessage>, mut out: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut snapshot = EditorSnapshot::default();

    while let Some(message) = rx.recv().await {
        let mut chunk = String::new();
        match message {
            OutputMessage::Lines(lines) => {
                if snapshot.active {
                    chunk.push_str(ERASE_LINE);
                }
                for line in lines {
                    chunk.push_str(&line);
                    chunk.push_str("\r\n");
                }
                repaint_input(&mut chunk, &snapshot);
            }
            OutputMessage::Snapshot(next) => {
                snapshot = next;
                chunk.push_str(ERASE_LINE);
                repaint_input(&mut chunk, &snapshot);
            }
            OutputMessage::Commit { prompt, line } => {
                snapshot.active = false;
                chunk.push_str(ERASE_LINE);
                chunk.push_str(&prompt);
                chunk.push_str(&line);
                chunk.push_str("\r\n");
            }
            OutputMessage::ClearScreen => {
                chunk.push_str(CLEAR_SCREEN);
                repaint_input(&mut chunk, &snapshot);
            }
            OutputMessage::Shutdown => break,
        }

        out.write_all(chunk.as_bytes()).await?;
        out.flush().await?;
    }

    debug!("printer stopped");
    Ok(())
}

/// Repaint `<prompt><buffer>` and move the cursor back into place.
fn repaint_input(chunk: &mut String, snapshot: &EditorSnapshot) {
    if !snapshot.active {
        return;
    }
    chunk.push_str(&snapshot.prompt);
    chunk.push_str(&snapshot.buffer);
    let back = snapshot.buffer.len().saturating_sub(snapshot.cursor);
    if back > 0 {
        chunk.push_str(&format!("\x1b[{}D", back));
    }
}
