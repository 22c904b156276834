//! Textual hex parsing and formatting
//!
//! ELM327 adapters speak hex-encoded octets over ASCII lines. This module is
//! the sole place where that text is converted to and from byte sequences.
//!
//! Two parse paths exist because the two directions have different trust:
//!
//! - Outgoing lines are under the operator's control and parse strictly
//!   ([`parse_strict`]): even digit count, every pair valid hex.
//! - Incoming lines may carry a CAN identifier prefix of 3 or 8 hex digits
//!   ([`parse_response`]): the header is stripped heuristically and pairs are
//!   consumed from the end backward so an unmatched header nibble at the
//!   front is tolerated.

use thiserror::Error;

/// Errors from the strict (outgoing) hex parse
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HexError {
    /// Digit count is odd, so the text cannot form whole octets
    #[error("odd number of hex digits ({0})")]
    OddLength(usize),

    /// A two-digit group was not valid hexadecimal
    #[error("invalid hex pair {0:?}")]
    InvalidPair(String),
}

/// Parse whitespace-separated hex text into bytes, strictly.
///
/// Requires an even number of digits and a valid hex pair for each octet.
/// An empty input yields an empty vector.
pub fn parse_strict(text: &str) -> Result<Vec<u8>, HexError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        bytes.push(parse_pair(pair).ok_or_else(|| {
            HexError::InvalidPair(pair.iter().collect())
        })?);
    }
    Ok(bytes)
}

/// Parse an adapter response line into bytes, stripping a CAN header.
///
/// Header strip rules, in order: a leading `'7'` with at least 3 digits
/// drops 3 (11-bit identifier such as `7E8`); otherwise a leading `"18"`
/// with at least 8 digits drops 8 (29-bit identifier such as `18DAF110`).
///
/// Pairs are then consumed from the end backward; a single leftover digit at
/// the front is treated as header remnant and dropped. Returns `None` only
/// when a non-hex pair is found.
pub fn parse_response(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = strip_can_header(&digits);

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    let mut end = digits.len();
    while end >= 2 {
        bytes.push(parse_pair(&digits[end - 2..end])?);
        end -= 2;
    }
    // end == 1 leaves an unmatched header nibble behind; tolerated.
    bytes.reverse();
    Some(bytes)
}

fn parse_pair(pair: &[char]) -> Option<u8> {
    match pair {
        [hi, lo] => {
            let hi = hi.to_digit(16)?;
            let lo = lo.to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        }
        _ => None,
    }
}

/// Drop a textual CAN identifier from the front of a digit string.
fn strip_can_header(digits: &[char]) -> &[char] {
    if digits.first() == Some(&'7') && digits.len() >= 3 {
        &digits[3..]
    } else if digits.len() >= 8 && digits[0] == '1' && digits[1] == '8' {
        &digits[8..]
    } else {
        digits
    }
}

/// Format bytes as two-digit uppercase hex, space-separated: `"AA BB CC"`.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render bytes as printable ASCII, substituting `.` outside `[0x20, 0x7E]`.
pub fn ascii_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if (0x20..=0x7E).contains(&b) {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
