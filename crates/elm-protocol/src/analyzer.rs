//! Frame analyzer
//!
//! Classifies a single line of adapter traffic — outgoing command or
//! incoming response — into an [`Annotation`]: a headline plus detail lines
//! that the terminal renders next to the raw traffic.
//!
//! Classification is first-match-wins and the order carries semantics:
//! adapter status strings such as `NO DATA` must never reach the hex
//! decoder even when they happen to contain hex-valid characters.
//!
//! The analyzer is total. No input line panics or errors; lines that fit no
//! rule simply produce no annotation.

use crate::hex;
use crate::isotp::{IsoTpEvent, Reassembler};
use crate::tables;

/// How the terminal should color an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational decode
    Info,
    /// Protocol-level problem (negative response, ISO-TP violation)
    Warning,
}

/// A decoded line: one headline, zero or more detail lines
///
/// Annotations are ephemeral; they are rendered and discarded. Direction is
/// implicit in which analyzer operation produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// One-line summary
    pub headline: String,
    /// Indented detail lines, in display order
    pub details: Vec<String>,
    /// Rendering hint
    pub severity: Severity,
}

impl Annotation {
    fn info(headline: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            headline: headline.into(),
            details,
            severity: Severity::Info,
        }
    }

    fn warning(headline: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            headline: headline.into(),
            details,
            severity: Severity::Warning,
        }
    }
}

/// Stateful line classifier for one adapter session
///
/// Holds the ISO-TP reassembly state, so it must see incoming lines in
/// arrival order. Call [`Analyzer::reset`] when the transport reconnects.
#[derive(Debug, Default)]
pub struct Analyzer {
    assembly: Reassembler,
}

impl Analyzer {
    /// Create an analyzer with no reassembly in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop session state (in-flight reassembly)
    pub fn reset(&mut self) {
        self.assembly.reset();
    }

    /// Classify an outgoing command line
    pub fn annotate_outgoing(&self, line: &str) -> Option<Annotation> {
        let line = line.trim();
        let upper = line.to_uppercase();

        if upper.starts_with("AT") {
            return Some(adapter_command("ELM", tables::at_command(&upper)));
        }
        if upper.starts_with("ST") {
            return Some(adapter_command("STN", tables::st_command(&upper)));
        }

        let bytes = hex::parse_strict(line).ok()?;
        let &mode = bytes.first()?;
        let obd = mode <= 0x0F;
        let protocol = if obd { "OBD-II" } else { "UDS/KWP" };

        let mut details = vec![format!("Hex: {}", hex::format_bytes(&bytes))];
        let description = if obd {
            tables::obd_mode(mode)
        } else {
            tables::uds_service(mode)
        };
        if let Some(description) = description {
            details.push(description.to_string());
        }
        if obd && bytes.len() >= 2 {
            let pid = bytes[1];
            match tables::pid_entry(pid) {
                Some(entry) => details.push(format!("PID {:02X}: {}", pid, entry.name)),
                None => details.push(format!("PID {:02X}", pid)),
            }
        }

        Some(Annotation::info(
            format!("{} request (mode {:02X})", protocol, mode),
            details,
        ))
    }

    /// Classify an incoming adapter line
    pub fn annotate_incoming(&mut self, line: &str) -> Option<Annotation> {
        let line = line.trim();
        let upper = line.to_uppercase();

        if upper.contains("NO DATA") {
            return Some(Annotation::info(
                "Adapter status",
                vec!["No ECU replied to this request".to_string()],
            ));
        }
        if upper.contains("SEARCHING") {
            return Some(Annotation::info(
                "Adapter status",
                vec!["Adapter is still trying to lock on a protocol".to_string()],
            ));
        }
        if upper == "OK" {
            return Some(Annotation::info("Adapter acknowledged command", vec![]));
        }

        let bytes = hex::parse_response(line)?;
        if bytes.len() < 2 {
            return None;
        }

        if bytes[0] == 0x7F && bytes.len() >= 3 {
            return Some(negative_response(&bytes));
        }

        match bytes[0] >> 4 {
            0x1 => {
                let event = self.assembly.first_frame(&bytes);
                Some(isotp_annotation(event))
            }
            0x2 => {
                let event = self.assembly.consecutive_frame(&bytes);
                Some(isotp_annotation(event))
            }
            _ => Some(positive_response(&bytes)),
        }
    }
}

fn isotp_annotation(event: IsoTpEvent) -> Annotation {
    match event {
        IsoTpEvent::FirstFrame { received, total } => Annotation::info(
            "ISO-TP first frame",
            vec![format!("Received {}/{} bytes", received, total)],
        ),
        IsoTpEvent::Progress { received, total } => Annotation::info(
            "ISO-TP consecutive frame",
            vec![format!("Received {}/{} bytes", received, total)],
        ),
        IsoTpEvent::Complete { message } => complete_message(&message),
        IsoTpEvent::OrphanFrame => Annotation::warning(
            "ISO-TP warning",
            vec!["Orphaned consecutive frame, no first frame in progress".to_string()],
        ),
        IsoTpEvent::SequenceError { expected, got } => Annotation::warning(
            "ISO-TP warning",
            vec![
                format!("Expected sequence {}, got {}", expected, got),
                "Reassembly aborted".to_string(),
            ],
        ),
    }
}

fn adapter_command(family: &str, hit: Option<(&'static str, &'static str)>) -> Annotation {
    match hit {
        Some((key, description)) => Annotation::info(
            format!("{} adapter command {}", family, key),
            vec![description.to_string()],
        ),
        None => Annotation::info(format!("{} adapter command", family), vec![]),
    }
}

fn negative_response(bytes: &[u8]) -> Annotation {
    let service = bytes[1];
    let nrc = bytes[2];
    Annotation::warning(
        format!("Negative Response (NRC 0x{:02X})", nrc),
        vec![
            format!("Service 0x{:02X} failed", service),
            tables::nrc_description(nrc).to_string(),
            format!("Hex: {}", hex::format_bytes(bytes)),
        ],
    )
}

fn positive_response(bytes: &[u8]) -> Annotation {
    let mode = bytes[0] & 0x3F;
    let pid = bytes[1];
    let payload = &bytes[2..];
    let obd = mode <= 0x0F;
    let protocol = if obd { "OBD-II" } else { "UDS/KWP" };

    let mut details = vec![
        format!("Hex: {}", hex::format_bytes(bytes)),
        format!("ASCII: {}", hex::ascii_preview(bytes)),
    ];
    let description = if obd {
        tables::obd_mode(mode)
    } else {
        tables::uds_service(mode)
    };
    if let Some(description) = description {
        details.push(format!("Mode {:02X}: {}", mode, description));
    }
    if let Some(entry) = tables::pid_entry(pid) {
        if let Some(value) = (entry.format)(payload) {
            details.push(format!("{}: {}", entry.name, value));
        }
    }

    Annotation::info(format!("{} response", protocol), details)
}

fn complete_message(message: &[u8]) -> Annotation {
    if message.len() >= 3 && message[0] == 0x49 && message[1] == 0x02 {
        let vin = hex::ascii_preview(&message[3..]);
        return Annotation::info(
            "VIN response",
            vec![
                format!("VIN: {}", vin),
                format!("Hex: {}", hex::format_bytes(message)),
            ],
        );
    }

    Annotation::info(
        format!("ISO-TP message complete ({} bytes)", message.len()),
        vec![
            format!("Hex: {}", hex::format_bytes(message)),
            format!("ASCII: {}", hex::ascii_preview(message)),
        ],
    )
}
