//! End-to-end scenarios through the public API: raw adapter byte stream in,
//! annotations out, the way the terminal drives the crate.

use elm_protocol::{Analyzer, Annotation, LineFramer, Severity};

/// Feed a chunked byte stream through the framer and analyzer.
fn annotate_stream(chunks: &[&[u8]]) -> Vec<Annotation> {
    let mut framer = LineFramer::new();
    let mut analyzer = Analyzer::new();
    let mut notes = Vec::new();

    for chunk in chunks {
        framer.push_bytes(chunk);
        while let Some(line) = framer.next_line() {
            let text = String::from_utf8_lossy(&line);
            if let Some(note) = analyzer.annotate_incoming(&text) {
                notes.push(note);
            }
        }
    }
    notes
}

#[test]
fn outgoing_mode_01_request() {
    let analyzer = Analyzer::new();
    let note = analyzer.annotate_outgoing("0100").unwrap();
    assert_eq!(note.headline, "OBD-II request (mode 01)");
    assert!(note.details.contains(&"Hex: 01 00".to_string()));
    assert!(note.details.contains(&"Show current data".to_string()));
    assert!(note.details.contains(&"PID 00".to_string()));
}

#[test]
fn incoming_response_with_can_header() {
    let notes = annotate_stream(&[b"7E8 41 00 BE 1F A8 13\r\n>"]);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].headline, "OBD-II response");
    assert!(notes[0].details.contains(&"Hex: 41 00 BE 1F A8 13".to_string()));
    assert!(notes[0].details.contains(&"ASCII: A.....".to_string()));
    assert!(notes[0]
        .details
        .contains(&"Mode 01: Show current data".to_string()));
}

#[test]
fn incoming_negative_response() {
    let notes = annotate_stream(&[b"7E8 7F 10 12\r"]);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].headline, "Negative Response (NRC 0x12)");
    assert!(notes[0].details.contains(&"Service 0x10 failed".to_string()));
    assert!(notes[0]
        .details
        .contains(&"Sub-function not supported".to_string()));
}

#[test]
fn multi_frame_vin_response() {
    // Frames arrive split across arbitrary chunk boundaries.
    let notes = annotate_stream(&[
        b"7E8 10 14 49 02 01 57 41 55\r7E8 21 5A",
        b" 5A 5A 38 54 38 42\r",
        b"7E8 22 41 30 33 34 33 37 34\r\n>",
    ]);
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0].headline, "ISO-TP first frame");
    assert_eq!(notes[0].details, vec!["Received 1/20 bytes"]);
    assert_eq!(notes[1].headline, "ISO-TP consecutive frame");
    assert_eq!(notes[1].details, vec!["Received 15/20 bytes"]);
    assert_eq!(notes[2].headline, "VIN response");
    assert!(notes[2].details[0].contains("WAUZZZ8T8BA034374"));
}

#[test]
fn orphan_consecutive_frame_warns() {
    let notes = annotate_stream(&[b"7E8 21 AA BB\r"]);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Warning);
    assert!(notes[0].details[0].contains("Orphaned consecutive frame"));
}

#[test]
fn sequence_error_warns_and_resets() {
    let notes = annotate_stream(&[
        b"7E8 10 14 49 02 01 57 41 55\r",
        b"7E8 22 41 30 33 34 33 37 34\r",
    ]);
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].severity, Severity::Warning);
    assert!(notes[1]
        .details
        .contains(&"Expected sequence 1, got 2".to_string()));
}
