//! Streaming line framer for adapter output
//!
//! ELM327 adapters terminate lines with CR, LF or both depending on the
//! `ATL` setting, and emit a `>` prompt byte when a response is complete.
//! The framer demarcates the raw byte stream into logical lines:
//!
//! - any run of `>` bytes at the buffer head is consumed and discarded
//! - the first CR or LF terminates a line; the whole consecutive CR/LF run
//!   that follows is consumed (CRLF, LFCR, CRCR, ... all collapse)
//! - empty lines are discarded without emission
//! - partial lines persist in the buffer across feeds

/// ELM327 end-of-response prompt byte
const PROMPT: u8 = b'>';

/// Streaming framer; push bytes in, pull complete lines out.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Push raw bytes into the framer's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete, non-empty line
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let lead = self.buffer.iter().take_while(|&&b| b == PROMPT).count();
            if lead > 0 {
                self.buffer.drain(..lead);
            }

            let term = self
                .buffer
                .iter()
                .position(|&b| b == b'\r' || b == b'\n')?;

            let line: Vec<u8> = self.buffer.drain(..term).collect();
            let run = self
                .buffer
                .iter()
                .take_while(|&&b| b == b'\r' || b == b'\n')
                .count();
            self.buffer.drain(..run);

            if !line.is_empty() {
                return Some(line);
            }
        }
    }

    /// Bytes of an incomplete line still held in the buffer
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any buffered partial line
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
