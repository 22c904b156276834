//! Session actor
//!
//! Owns all per-connection state — analyzer, line framer, echo cell, history
//! appends, meta command dispatch — and multiplexes three event sources:
//! committed lines from the editor, bytes from the transport reader, and the
//! shutdown signal. Incoming lines are processed synchronously in arrival
//! order, so annotations for line N are always emitted before anything
//! derived from line N+1, and the ISO-TP state never sees frames out of
//! order.
//!
//! The actor never touches stdout or the transport directly: rendered lines
//! go to the printer queue, outgoing bytes to the writer task's bounded
//! queue.

use std::sync::Arc;
use std::time::Duration;

use elm_protocol::{Analyzer, Annotation, LineFramer, Severity};
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Terminator;
use crate::history::History;
use crate::meta::{MetaCommand, HELP_TEXT};
use crate::printer::OutputMessage;
use crate::theme::Palette;
use crate::transport::ByteStream;

/// Events published by the line editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// A committed command line
    Line(String),
    /// Ctrl-D on an empty line, or stdin closed
    Eof,
}

/// Events published by the transport reader and writer tasks
#[derive(Debug)]
enum TransportEvent {
    /// Raw bytes from the adapter
    Data(Vec<u8>),
    /// The adapter closed the stream
    Eof,
    /// Read or write failure
    Error(std::io::Error),
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `:quit`, `:exit` or bare `quit`/`exit`
    Quit,
    /// End of input on the terminal
    Eof,
    /// SIGINT
    Interrupted,
    /// The adapter closed the connection
    TransportClosed,
    /// Unrecoverable transport failure
    TransportError,
}

impl ExitReason {
    /// Whether this counts as a clean exit (process exit code 0)
    pub fn is_clean(self) -> bool {
        matches!(self, ExitReason::Quit | ExitReason::Eof | ExitReason::Interrupted)
    }
}

/// Per-session behavior switches
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bytes appended to each transmitted command
    pub terminator: Terminator,
    /// Color palette
    pub palette: Palette,
    /// Annotation on/off (`--plain` starts with this false)
    pub analyzer_enabled: bool,
    /// Also print hex+ASCII dumps of incoming lines
    pub hexdump: bool,
    /// Prefix incoming lines with ISO-8601 timestamps
    pub timestamps: bool,
}

/// Drive one adapter session to completion.
///
/// `stream` is the connected transport; `user_rx` carries committed lines
/// from the editor; rendered output goes to `out_tx`. Flipping `shutdown_rx`
/// to `true` requests a graceful stop (SIGINT path).
pub async fn run_session(
    stream: Box<dyn ByteStream>,
    options: SessionOptions,
    history: Arc<RwLock<History>>,
    mut user_rx: mpsc::Receiver<UserEvent>,
    out_tx: mpsc::Sender<OutputMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> ExitReason {
    let (read_half, write_half) = tokio::io::split(stream);

    let (transport_tx, mut transport_rx) = mpsc::channel::<TransportEvent>(64);
    let (write_tx, write_rx) = mpsc::channel::<Vec<u8>>(64);

    let reader = tokio::spawn(run_reader(read_half, transport_tx.clone()));
    let writer = tokio::spawn(run_writer(write_rx, write_half, transport_tx));

    let mut session = Session {
        analyzer: Analyzer::new(),
        framer: LineFramer::new(),
        echo: None,
        history,
        options,
        out_tx,
        write_tx,
    };

    let reason = loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                session.status("interrupt received, closing").await;
                break ExitReason::Interrupted;
            }
            event = user_rx.recv() => match event {
                Some(UserEvent::Line(line)) => {
                    if session.handle_user_line(&line).await == Flow::Quit {
                        break ExitReason::Quit;
                    }
                }
                Some(UserEvent::Eof) | None => {
                    session.status("end of input, closing").await;
                    break ExitReason::Eof;
                }
            },
            event = transport_rx.recv() => match event {
                Some(TransportEvent::Data(bytes)) => session.handle_transport_data(&bytes).await,
                Some(TransportEvent::Eof) => {
                    session.status("adapter closed the connection").await;
                    break ExitReason::TransportClosed;
                }
                Some(TransportEvent::Error(e)) => {
                    session.error(&format!("transport error: {}", e)).await;
                    break ExitReason::TransportError;
                }
                None => break ExitReason::TransportError,
            },
        }
    };

    // Persist history and drain pending writes, best effort.
    if let Err(e) = session.history.read().save() {
        warn!("history save failed: {}", e);
    }
    reader.abort();
    let Session { write_tx, out_tx, .. } = session;
    drop(write_tx);
    let _ = tokio::time::timeout(Duration::from_millis(250), writer).await;
    let _ = out_tx.send(OutputMessage::Shutdown).await;

    info!("session ended: {:?}", reason);
    reason
}

/// Result of handling one user line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Session {
    analyzer: Analyzer,
    framer: LineFramer,
    /// Most recent sent command, uppercased, awaiting its local echo
    echo: Option<String>,
    history: Arc<RwLock<History>>,
    options: SessionOptions,
    out_tx: mpsc::Sender<OutputMessage>,
    write_tx: mpsc::Sender<Vec<u8>>,
}

impl Session {
    async fn handle_user_line(&mut self, line: &str) -> Flow {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Flow::Continue;
        }

        if trimmed.starts_with(':') {
            return self.handle_meta(trimmed).await;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            return Flow::Quit;
        }

        let save_err = {
            let mut history = self.history.write();
            history.append(trimmed);
            history.save().err()
        };
        if let Some(e) = save_err {
            self.status(&format!("history not saved: {}", e)).await;
        }

        if self.options.analyzer_enabled {
            if let Some(note) = self.analyzer.annotate_outgoing(trimmed) {
                let lines = self.render_annotation(&note, self.options.palette.outgoing);
                self.print(lines).await;
            }
        }

        self.echo = Some(trimmed.to_uppercase());

        let mut bytes = trimmed.as_bytes().to_vec();
        bytes.extend_from_slice(self.options.terminator.as_bytes());
        // A closed queue means the writer already reported the failure.
        let _ = self.write_tx.send(bytes).await;

        Flow::Continue
    }

    async fn handle_meta(&mut self, line: &str) -> Flow {
        let command = match MetaCommand::parse(line) {
            Ok(command) => command,
            Err(message) => {
                self.error(&message).await;
                return Flow::Continue;
            }
        };

        match command {
            MetaCommand::Help => {
                let palette = self.options.palette;
                let lines = HELP_TEXT
                    .iter()
                    .map(|l| palette.paint(palette.status, l))
                    .collect();
                self.print(lines).await;
            }
            MetaCommand::History(count) => {
                let lines = {
                    let history = self.history.read();
                    let entries = history.entries();
                    let skip = entries.len().saturating_sub(count);
                    let palette = self.options.palette;
                    entries[skip..]
                        .iter()
                        .enumerate()
                        .map(|(i, cmd)| {
                            palette.paint(
                                palette.status,
                                &format!("{:4}  {}", skip + i + 1, cmd),
                            )
                        })
                        .collect::<Vec<_>>()
                };
                if lines.is_empty() {
                    self.status("history is empty").await;
                } else {
                    self.print(lines).await;
                }
            }
            MetaCommand::Clear => {
                let _ = self.out_tx.send(OutputMessage::ClearScreen).await;
            }
            MetaCommand::Analyzer(setting) => {
                self.options.analyzer_enabled =
                    setting.unwrap_or(!self.options.analyzer_enabled);
                let state = if self.options.analyzer_enabled { "on" } else { "off" };
                self.status(&format!("analyzer {}", state)).await;
            }
            MetaCommand::Save => {
                let (result, count) = {
                    let history = self.history.read();
                    (history.save(), history.len())
                };
                match result {
                    Ok(()) => {
                        self.status(&format!("history saved ({} entries)", count)).await;
                    }
                    Err(e) => self.status(&format!("history not saved: {}", e)).await,
                }
            }
            MetaCommand::Quit => return Flow::Quit,
        }

        Flow::Continue
    }

    async fn handle_transport_data(&mut self, bytes: &[u8]) {
        self.framer.push_bytes(bytes);
        while let Some(line) = self.framer.next_line() {
            let text = String::from_utf8_lossy(&line).to_string();
            self.handle_incoming_line(&text).await;
        }
    }

    async fn handle_incoming_line(&mut self, text: &str) {
        // Local echo of the command just sent is dropped entirely, once.
        if let Some(cell) = &self.echo {
            if text.trim().to_uppercase() == *cell {
                debug!("suppressed echo of {:?}", cell);
                self.echo = None;
                return;
            }
        }

        let palette = self.options.palette;
        let mut lines = Vec::new();

        let mut display = palette.paint(palette.incoming, text);
        if self.options.timestamps {
            display = format!("{} {}", palette.paint(palette.dim, &timestamp()), display);
        }
        lines.push(display);

        if self.options.hexdump {
            let bytes = text.as_bytes();
            lines.push(palette.paint(
                palette.dim,
                &format!(
                    "  {}  |{}|",
                    elm_protocol::hex::format_bytes(bytes),
                    elm_protocol::hex::ascii_preview(bytes)
                ),
            ));
        }

        if self.options.analyzer_enabled {
            if let Some(note) = self.analyzer.annotate_incoming(text) {
                let headline_color = match note.severity {
                    Severity::Warning => palette.warning,
                    Severity::Info => palette.status,
                };
                lines.extend(self.render_annotation(&note, headline_color));
            }
        }

        self.print(lines).await;
    }

    fn render_annotation(&self, note: &Annotation, headline_color: &'static str) -> Vec<String> {
        let palette = self.options.palette;
        let mut lines = vec![palette.paint(headline_color, &note.headline)];
        for detail in &note.details {
            lines.push(palette.paint(palette.detail, &format!("  {}", detail)));
        }
        lines
    }

    async fn print(&self, lines: Vec<String>) {
        let _ = self.out_tx.send(OutputMessage::Lines(lines)).await;
    }

    async fn status(&self, text: &str) {
        let palette = self.options.palette;
        self.print(vec![palette.paint(palette.status, text)]).await;
    }

    async fn error(&self, text: &str) {
        let palette = self.options.palette;
        self.print(vec![palette.paint(palette.error, text)]).await;
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

/// Resolve when a graceful stop is requested. Never resolves if the signal
/// source goes away without asking for one.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_reader(
    mut half: ReadHalf<Box<dyn ByteStream>>,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut buf = vec![0u8; 1024];
    loop {
        match half.read(&mut buf).await {
            Ok(0) => {
                let _ = events.send(TransportEvent::Eof).await;
                break;
            }
            Ok(n) => {
                if events.send(TransportEvent::Data(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e)).await;
                break;
            }
        }
    }
}

async fn run_writer(
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut half: WriteHalf<Box<dyn ByteStream>>,
    events: mpsc::Sender<TransportEvent>,
) {
    while let Some(bytes) = rx.recv().await {
        let result = async {
            half.write_all(&bytes).await?;
            half.flush().await
        }
        .await;
        if let Err(e) = result {
            let _ = events.send(TransportEvent::Error(e)).await;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_history(name: &str) -> Arc<RwLock<History>> {
        let path = PathBuf::from(std::env::temp_dir())
            .join(format!("elmterm-session-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        Arc::new(RwLock::new(History::load(&path, 50)))
    }

    fn options() -> SessionOptions {
        SessionOptions {
            terminator: Terminator::default(),
            palette: Palette::plain(),
            analyzer_enabled: true,
            hexdump: false,
            timestamps: false,
        }
    }

    struct Harness {
        user_tx: mpsc::Sender<UserEvent>,
        out_rx: mpsc::Receiver<OutputMessage>,
        shutdown_tx: watch::Sender<bool>,
        adapter: tokio::io::DuplexStream,
        session: tokio::task::JoinHandle<ExitReason>,
    }

    fn start(options: SessionOptions, history: Arc<RwLock<History>>) -> Harness {
        let (client, adapter) = tokio::io::duplex(4096);
        let (user_tx, user_rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = tokio::spawn(run_session(
            Box::new(client),
            options,
            history,
            user_rx,
            out_tx,
            shutdown_rx,
        ));
        Harness {
            user_tx,
            out_rx,
            shutdown_tx,
            adapter,
            session,
        }
    }

    /// Collect all printed lines until the printer shutdown message.
    async fn collect_lines(mut out_rx: mpsc::Receiver<OutputMessage>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(message) = out_rx.recv().await {
            match message {
                OutputMessage::Lines(batch) => lines.extend(batch),
                OutputMessage::Shutdown => break,
                _ => {}
            }
        }
        lines
    }

    #[tokio::test]
    async fn test_send_path_writes_command_with_terminator() {
        let mut h = start(options(), scratch_history("send"));
        h.user_tx
            .send(UserEvent::Line("0100".to_string()))
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let n = h.adapter.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"0100\r");

        h.user_tx.send(UserEvent::Line("quit".to_string())).await.unwrap();
        assert_eq!(h.session.await.unwrap(), ExitReason::Quit);
    }

    #[tokio::test]
    async fn test_outgoing_annotation_and_echo_suppression() {
        let mut h = start(options(), scratch_history("echo"));
        h.user_tx
            .send(UserEvent::Line("0100".to_string()))
            .await
            .unwrap();

        // Drain the command from the adapter side, then echo it back
        // followed by a real response.
        let mut buf = [0u8; 16];
        let _ = h.adapter.read(&mut buf).await.unwrap();
        h.adapter
            .write_all(b"0100\r41 00 BE 1F A8 13\r\n>")
            .await
            .unwrap();
        h.adapter.flush().await.unwrap();

        // Give the session time to process, then quit.
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.user_tx.send(UserEvent::Line(":quit".to_string())).await.unwrap();
        assert_eq!(h.session.await.unwrap(), ExitReason::Quit);

        let lines = collect_lines(h.out_rx).await;
        // Outgoing annotation came first.
        let outgoing = lines
            .iter()
            .position(|l| l == "OBD-II request (mode 01)")
            .expect("outgoing annotation");
        let incoming = lines
            .iter()
            .position(|l| l == "41 00 BE 1F A8 13")
            .expect("incoming line");
        assert!(outgoing < incoming);
        // The echoed command was dropped, not displayed.
        assert!(!lines.iter().any(|l| l == "0100"));
        // The response annotation is present with its details.
        assert!(lines.iter().any(|l| l == "OBD-II response"));
        assert!(lines.iter().any(|l| l == "  Hex: 41 00 BE 1F A8 13"));
    }

    #[tokio::test]
    async fn test_echo_suppressed_only_once() {
        let mut h = start(options(), scratch_history("echo-once"));
        h.user_tx
            .send(UserEvent::Line("ATZ".to_string()))
            .await
            .unwrap();
        let mut buf = [0u8; 16];
        let _ = h.adapter.read(&mut buf).await.unwrap();
        // Adapter echoes twice; only the first duplicate is suppressed.
        h.adapter.write_all(b"ATZ\rATZ\r").await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        h.user_tx.send(UserEvent::Line(":quit".to_string())).await.unwrap();
        h.session.await.unwrap();

        let lines = collect_lines(h.out_rx).await;
        let shown = lines.iter().filter(|l| *l == "ATZ").count();
        assert_eq!(shown, 1);
    }

    #[tokio::test]
    async fn test_meta_commands() {
        let mut h = start(options(), scratch_history("meta"));

        h.user_tx.send(UserEvent::Line("0100".to_string())).await.unwrap();
        h.user_tx.send(UserEvent::Line(":history 5".to_string())).await.unwrap();
        h.user_tx.send(UserEvent::Line(":analyzer off".to_string())).await.unwrap();
        h.user_tx.send(UserEvent::Line(":bogus".to_string())).await.unwrap();
        // Analyzer is off: this command produces no annotation.
        h.user_tx.send(UserEvent::Line("010C".to_string())).await.unwrap();
        h.user_tx.send(UserEvent::Line(":exit".to_string())).await.unwrap();

        assert_eq!(h.session.await.unwrap(), ExitReason::Quit);
        let lines = collect_lines(h.out_rx).await;

        assert!(lines.iter().any(|l| l.contains("1  0100")));
        assert!(lines.iter().any(|l| l == "analyzer off"));
        assert!(lines.iter().any(|l| l.contains("unknown meta command :bogus")));
        // 010C was sent after :analyzer off, so its annotation never appeared.
        assert!(!lines.iter().any(|l| l.contains("PID 0C")));
    }

    #[tokio::test]
    async fn test_meta_lines_are_not_transmitted_or_recorded() {
        let history = scratch_history("meta-hist");
        let mut h = start(options(), history.clone());
        h.user_tx.send(UserEvent::Line(":help".to_string())).await.unwrap();
        h.user_tx.send(UserEvent::Line("ATRV".to_string())).await.unwrap();

        let mut buf = [0u8; 32];
        let n = h.adapter.read(&mut buf).await.unwrap();
        // The first transport bytes are the real command, not ":help".
        assert_eq!(&buf[..n], b"ATRV\r");

        h.user_tx.send(UserEvent::Line("exit".to_string())).await.unwrap();
        h.session.await.unwrap();
        assert_eq!(history.read().entries(), &["ATRV"]);
    }

    #[tokio::test]
    async fn test_adapter_eof_closes_session() {
        let h = start(options(), scratch_history("eof"));
        drop(h.adapter);
        assert_eq!(h.session.await.unwrap(), ExitReason::TransportClosed);
        assert!(!ExitReason::TransportClosed.is_clean());
    }

    #[tokio::test]
    async fn test_user_eof_is_clean() {
        let h = start(options(), scratch_history("user-eof"));
        h.user_tx.send(UserEvent::Eof).await.unwrap();
        assert_eq!(h.session.await.unwrap(), ExitReason::Eof);
        assert!(ExitReason::Eof.is_clean());
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let h = start(options(), scratch_history("signal"));
        h.shutdown_tx.send(true).unwrap();
        assert_eq!(h.session.await.unwrap(), ExitReason::Interrupted);
        assert!(ExitReason::Interrupted.is_clean());
    }

    #[tokio::test]
    async fn test_multiframe_vin_annotated() {
        let mut h = start(options(), scratch_history("vin"));
        h.adapter
            .write_all(
                b"7E8 10 14 49 02 01 57 41 55\r\
                  7E8 21 5A 5A 5A 38 54 38 42\r\
                  7E8 22 41 30 33 34 33 37 34\r>",
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        h.user_tx.send(UserEvent::Line(":quit".to_string())).await.unwrap();
        h.session.await.unwrap();

        let lines = collect_lines(h.out_rx).await;
        assert!(lines.iter().any(|l| l == "VIN response"));
        assert!(lines.iter().any(|l| l.contains("WAUZZZ8T8BA034374")));
    }
}
