//! ELM Terminal Engine
//!
//! This crate provides the interactive half of the diagnostic terminal: the
//! concurrency scaffolding that sits between the operator's keyboard, the
//! adapter transport and the protocol analyzer.
//!
//! # Architecture
//!
//! Five cooperating activities, connected only by channels:
//!
//! ```text
//!  stdin (raw mode)          transport read half
//!       |                           |
//!  [editor thread]          [reader task + LineFramer]
//!       | UserEvent                 | TransportEvent
//!       +-----------+---------------+
//!                   |
//!             [session actor]  --- Analyzer / echo cell / history / meta
//!               |         |
//!   OutputMessage         | Vec<u8>
//!               |         |
//!        [printer task]  [writer task]
//!            stdout       transport write half
//! ```
//!
//! The printer is the single stdout writer: it consumes both rendered lines
//! and editor snapshots from one queue, so annotations never interleave with
//! the line being edited. The writer task drains a bounded byte queue, which
//! realizes send backpressure. The session actor owns all protocol state and
//! sees incoming lines in arrival order.
//!
//! Transports are plain byte streams ([`transport::ByteStream`]), so tests
//! drive the whole engine against `tokio::io::duplex` in place of a serial
//! port or TCP socket.

pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod meta;
pub mod printer;
pub mod session;
pub mod theme;
pub mod transport;

pub use config::{Settings, Terminator};
pub use error::TermError;
pub use history::History;
pub use printer::{EditorSnapshot, OutputMessage};
pub use session::{run_session, ExitReason, SessionOptions, UserEvent};
pub use theme::Palette;
pub use transport::{dial, ByteStream, Endpoint};
