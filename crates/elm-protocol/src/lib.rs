//! ELM Protocol Library
//!
//! This crate provides the protocol-aware half of an ELM327/STN diagnostic
//! terminal: everything needed to turn the adapter's line-oriented ASCII
//! output (and the operator's outgoing commands) into annotated, structured
//! records.
//!
//! # Architecture
//!
//! - [`framer`]: streaming line framer that demarcates adapter output into
//!   byte-lines across CR/LF mixtures and `>` prompt bytes
//! - [`hex`]: textual hex to octets and back, including the CAN-header
//!   strip heuristic for 11-bit (`7xx`) and 29-bit (`18xxxxxx`) identifiers
//! - [`isotp`]: ISO 15765-2 first-frame/consecutive-frame reassembly state
//!   machine with sequence validation
//! - [`analyzer`]: classifies a line (outgoing or incoming) into an
//!   [`Annotation`] — AT/ST commands, OBD-II and UDS/KWP requests, negative
//!   responses, multi-frame progress, VIN extraction
//! - [`tables`]: the AT/ST command, service mode, PID and NRC lookup tables
//!
//! Everything here is pure and synchronous; transports and terminals live in
//! the `elm-term` crate.
//!
//! # Example
//!
//! ```rust
//! use elm_protocol::Analyzer;
//!
//! let mut analyzer = Analyzer::new();
//!
//! let note = analyzer.annotate_outgoing("0100").unwrap();
//! assert_eq!(note.headline, "OBD-II request (mode 01)");
//!
//! // CAN header 7E8 is stripped before decoding.
//! let note = analyzer.annotate_incoming("7E8 41 0C 1A F8").unwrap();
//! assert_eq!(note.headline, "OBD-II response");
//! ```

pub mod analyzer;
pub mod framer;
pub mod hex;
pub mod isotp;
pub mod tables;

pub use analyzer::{Analyzer, Annotation, Severity};
pub use framer::LineFramer;
pub use hex::HexError;
pub use isotp::{IsoTpEvent, Reassembler};
