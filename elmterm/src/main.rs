//! elmterm — interactive diagnostic terminal for ELM327/STN adapters
//!
//! Wires the pieces of `elm-term` together: parses arguments, merges the
//! JSON preferences file, dials the transport, then runs the editor thread,
//! printer task, signal handler and session actor until one of them asks
//! for shutdown.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use elm_term::config::{expand_home, FileConfig, Settings, Terminator};
use elm_term::theme::{Palette, Theme};
use elm_term::{
    dial, editor, printer, run_session, Endpoint, ExitReason, History, OutputMessage,
    SessionOptions, TermError,
};
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "elmterm",
    version,
    about = "Interactive terminal for ELM327/STN OBD-II adapters",
    after_help = "URLs: tty://[<baud>]/<device-path> (default 38400 baud) or tcp://<host>:<port>"
)]
struct Cli {
    /// Connection URL
    url: String,

    /// Connect timeout in seconds
    #[arg(short, long, default_value_t = 12.0)]
    timeout: f64,

    /// REPL prompt
    #[arg(short, long, default_value = "> ")]
    prompt: String,

    /// Bytes appended on send: cr, lf, crlf, none, hex:<HEX>, or a literal
    #[arg(long, default_value = "cr")]
    terminator: String,

    /// History file (default ~/.elmterm.history)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Maximum retained history entries (default 500)
    #[arg(long)]
    history_depth: Option<usize>,

    /// JSON preferences file (default ~/.elmterm.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color palette: light or dark
    #[arg(long)]
    theme: Option<String>,

    /// Also print hex+ASCII dumps of incoming lines
    #[arg(long)]
    hexdump: bool,

    /// Disable the analyzer
    #[arg(long)]
    plain: bool,

    /// Prefix incoming lines with ISO-8601 timestamps
    #[arg(long)]
    timestamps: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ELMTERM_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match merge_settings(cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("elmterm: {}", e);
            return ExitCode::from(2);
        }
    };

    let result = tokio::runtime::Runtime::new()
        .map_err(TermError::from)
        .and_then(|rt| rt.block_on(run_terminal(settings)));

    // The editor thread may have been abandoned mid-read.
    editor::restore_terminal();

    match result {
        Ok(reason) if reason.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("elmterm: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Merge CLI flags over the config file over built-in defaults.
fn merge_settings(cli: Cli) -> Result<Settings, TermError> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("~/.elmterm.json"));
    let file = FileConfig::load(&expand_home(&config_path), cli.config.is_some())?;

    let theme = match cli.theme.as_deref() {
        Some(name) => name
            .parse::<Theme>()
            .map_err(TermError::InvalidArgument)?,
        None => file.theme.unwrap_or_default(),
    };

    if !cli.timeout.is_finite() || cli.timeout <= 0.0 {
        return Err(TermError::InvalidArgument(format!(
            "timeout must be a positive number of seconds, got {}",
            cli.timeout
        )));
    }

    let history_path = cli
        .history
        .or(file.history_path)
        .unwrap_or_else(|| PathBuf::from("~/.elmterm.history"));

    Ok(Settings {
        url: cli.url,
        timeout: Duration::from_secs_f64(cli.timeout),
        prompt: cli.prompt,
        terminator: Terminator::parse(&cli.terminator)?,
        history_path: expand_home(&history_path),
        history_depth: cli.history_depth.or(file.history_depth).unwrap_or(500),
        theme,
        hexdump: cli.hexdump,
        plain: cli.plain,
        timestamps: cli.timestamps,
    })
}

async fn run_terminal(settings: Settings) -> Result<ExitReason, TermError> {
    let endpoint = Endpoint::parse(&settings.url)?;
    let stream = dial(&endpoint, settings.timeout).await?;

    let history = Arc::new(RwLock::new(History::load(
        &settings.history_path,
        settings.history_depth,
    )));

    let (out_tx, out_rx) = mpsc::channel::<OutputMessage>(256);
    let (user_tx, user_rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let editor_stop = Arc::new(AtomicBool::new(false));

    let printer = tokio::spawn(printer::run_printer(out_rx, tokio::io::stdout()));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("SIGINT received");
            let _ = shutdown_tx.send(true);
        }
        // Keep the sender alive; a second SIGINT is not special-cased.
        std::future::pending::<()>().await;
    });

    let palette = Palette::for_theme(settings.theme);
    let _ = out_tx
        .send(OutputMessage::Lines(vec![palette.paint(
            palette.status,
            &format!("connected to {} ({})", settings.url, endpoint),
        )]))
        .await;

    {
        let prompt = settings.prompt.clone();
        let history = history.clone();
        let out_tx = out_tx.clone();
        let editor_stop = editor_stop.clone();
        std::thread::spawn(move || {
            editor::run_editor(prompt, history, out_tx, user_tx, editor_stop);
        });
    }

    let options = SessionOptions {
        terminator: settings.terminator.clone(),
        palette,
        analyzer_enabled: !settings.plain,
        hexdump: settings.hexdump,
        timestamps: settings.timestamps,
    };

    let reason = run_session(stream, options, history, user_rx, out_tx, shutdown_rx).await;

    editor_stop.store(true, Ordering::Relaxed);
    let _ = tokio::time::timeout(Duration::from_millis(250), printer).await;

    Ok(reason)
}
