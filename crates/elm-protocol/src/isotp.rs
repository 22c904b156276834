//! ISO 15765-2 (ISO-TP) multi-frame reassembly
//!
//! Payloads longer than a single CAN frame arrive as a First Frame carrying
//! a 12-bit total length followed by Consecutive Frames with a 4-bit rolling
//! sequence number. The reassembler stitches them back into one message.
//!
//! # Frame format
//! - FF: `1L LL p p p p p p` — upper nibble 0x1, 12-bit length, payload
//! - CF: `2S p p p p p p p` — upper nibble 0x2, 4-bit sequence, payload
//!
//! At most one reassembly is in flight. A First Frame arriving mid-assembly
//! restarts the state; sequence mismatches abort it. Flow control frames are
//! never seen here because the ELM327 handles them on the bus side.

use tracing::debug;

/// Outcome of feeding one frame to the reassembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsoTpEvent {
    /// A First Frame opened a new assembly; `total` is the declared length
    FirstFrame { received: usize, total: usize },
    /// A Consecutive Frame was accepted but the message is not complete yet
    Progress { received: usize, total: usize },
    /// The final Consecutive Frame arrived; `message` is the full payload
    Complete { message: Vec<u8> },
    /// A Consecutive Frame arrived with no assembly in flight
    OrphanFrame,
    /// Sequence number mismatch; the assembly was discarded
    SequenceError { expected: u8, got: u8 },
}

/// In-flight assembly state
#[derive(Debug)]
struct Assembly {
    total: usize,
    buffer: Vec<u8>,
    next_seq: u8,
}

/// ISO-TP reassembly state machine
///
/// Scoped to one adapter session; call [`Reassembler::reset`] on reconnect.
#[derive(Debug, Default)]
pub struct Reassembler {
    assembly: Option<Assembly>,
}

impl Reassembler {
    /// Create an idle reassembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard any assembly in flight
    pub fn reset(&mut self) {
        self.assembly = None;
    }

    /// Feed a First Frame (`frame[0]` upper nibble 0x1, `frame.len() >= 2`)
    pub fn first_frame(&mut self, frame: &[u8]) -> IsoTpEvent {
        if self.assembly.is_some() {
            debug!("first frame while reassembly in flight, restarting");
        }

        let total = ((frame[0] as usize & 0x0F) << 8) | frame[1] as usize;
        self.assembly = Some(Assembly {
            total,
            buffer: frame[2..].to_vec(),
            next_seq: 1,
        });

        IsoTpEvent::FirstFrame { received: 1, total }
    }

    /// Feed a Consecutive Frame (`frame[0]` upper nibble 0x2)
    pub fn consecutive_frame(&mut self, frame: &[u8]) -> IsoTpEvent {
        let Some(assembly) = self.assembly.as_mut() else {
            return IsoTpEvent::OrphanFrame;
        };

        let seq = frame[0] & 0x0F;
        if seq != assembly.next_seq {
            let expected = assembly.next_seq;
            self.assembly = None;
            return IsoTpEvent::SequenceError { expected, got: seq };
        }

        assembly.buffer.extend_from_slice(&frame[1..]);
        assembly.next_seq = (assembly.next_seq + 1) % 16;

        if assembly.buffer.len() >= assembly.total {
            let mut assembly = self.assembly.take().expect("assembly present");
            assembly.buffer.truncate(assembly.total);
            return IsoTpEvent::Complete {
                message: assembly.buffer,
            };
        }

        IsoTpEvent::Progress {
            // Byte count as the adapter reported it: the two FF PCI bytes
            // are part of the tally.
            received: assembly.buffer.len() + 2,
            total: assembly.total,
        }
    }

    /// Whether an assembly is currently in flight
    pub fn is_collecting(&self) -> bool {
        self.assembly.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The three frames of a 20-byte mode 09 PID 02 (VIN) response, headers
    // already stripped.
    const FF: &[u8] = &[0x10, 0x14, 0x49, 0x02, 0x01, 0x57, 0x41, 0x55];
    const CF1: &[u8] = &[0x21, 0x5A, 0x5A, 0x5A, 0x38, 0x54, 0x38, 0x42];
    const CF2: &[u8] = &[0x22, 0x41, 0x30, 0x33, 0x34, 0x33, 0x37, 0x34];

    #[test]
    fn test_vin_reassembly() {
        let mut tp = Reassembler::new();

        assert_eq!(
            tp.first_frame(FF),
            IsoTpEvent::FirstFrame {
                received: 1,
                total: 20
            }
        );
        assert!(tp.is_collecting());

        assert_eq!(
            tp.consecutive_frame(CF1),
            IsoTpEvent::Progress {
                received: 15,
                total: 20
            }
        );

        let IsoTpEvent::Complete { message } = tp.consecutive_frame(CF2) else {
            panic!("expected complete message");
        };
        assert_eq!(message.len(), 20);
        assert_eq!(&message[..3], &[0x49, 0x02, 0x01]);
        assert_eq!(&message[3..], b"WAUZZZ8T8BA034374");
        assert!(!tp.is_collecting());
    }

    #[test]
    fn test_orphan_consecutive_frame() {
        let mut tp = Reassembler::new();
        assert_eq!(
            tp.consecutive_frame(&[0x21, 0xAA, 0xBB]),
            IsoTpEvent::OrphanFrame
        );
        assert!(!tp.is_collecting());
    }

    #[test]
    fn test_sequence_error_resets_state() {
        let mut tp = Reassembler::new();
        tp.first_frame(FF);
        assert_eq!(
            tp.consecutive_frame(CF2),
            IsoTpEvent::SequenceError {
                expected: 1,
                got: 2
            }
        );
        assert!(!tp.is_collecting());
        // A follow-up CF is now orphaned.
        assert_eq!(tp.consecutive_frame(CF1), IsoTpEvent::OrphanFrame);
    }

    #[test]
    fn test_first_frame_restarts_assembly() {
        let mut tp = Reassembler::new();
        tp.first_frame(FF);
        tp.consecutive_frame(CF1);

        // Second FF silently overwrites the in-flight assembly.
        assert_eq!(
            tp.first_frame(&[0x10, 0x0A, 0x62, 0xF1, 0x90, 0x31, 0x32, 0x33]),
            IsoTpEvent::FirstFrame {
                received: 1,
                total: 10
            }
        );
        let IsoTpEvent::Complete { message } =
            tp.consecutive_frame(&[0x21, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x30])
        else {
            panic!("expected complete message");
        };
        assert_eq!(message, vec![0x62, 0xF1, 0x90, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37]);
    }

    #[test]
    fn test_sequence_wraps_mod_16() {
        // 120-byte message: FF carries 6 bytes, then 17 CFs of 7 bytes each.
        // Sequence numbers run 1..15, wrap to 0, and continue.
        let mut tp = Reassembler::new();
        tp.first_frame(&[0x10, 120, 0, 0, 0, 0, 0, 0]);

        let mut seq: u8 = 1;
        let mut received = 6;
        while received + 7 < 120 {
            let frame = [0x20 | seq, 1, 2, 3, 4, 5, 6, 7];
            assert!(matches!(
                tp.consecutive_frame(&frame),
                IsoTpEvent::Progress { .. }
            ));
            seq = (seq + 1) % 16;
            received += 7;
        }
        assert_eq!(seq, 1); // wrapped past 15 and 0
        let frame = [0x20 | seq, 1, 2, 3, 4, 5, 6, 7];
        let IsoTpEvent::Complete { message } = tp.consecutive_frame(&frame) else {
            panic!("expected complete message");
        };
        assert_eq!(message.len(), 120);
    }
}
