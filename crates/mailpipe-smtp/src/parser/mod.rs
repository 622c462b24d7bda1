//! SMTP reply framing and parsing.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Checks if a line terminates an SMTP reply.
///
/// A reply is complete when the line starts with a three-digit code followed
/// by whitespace. Continuation lines of a multi-line reply (`250-...`) use a
/// `-` separator instead and never satisfy this.
#[must_use]
pub fn is_reply_complete(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 4
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3].is_ascii_whitespace()
}

/// Parses an SMTP reply from its accumulated lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// Only the final line's code decides the outcome of a step, so the code is
/// taken from the last line; earlier lines contribute message text only.
///
/// # Errors
///
/// Returns an error if the reply is empty or the final line carries no
/// numeric code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let last = lines
        .last()
        .ok_or_else(|| Error::Protocol("Empty reply".into()))?;
    // Byte-range slicing: replies pass through lossy UTF-8 decoding, so a
    // garbage line may not have a char boundary at index 3
    let code_str = last
        .get(0..3)
        .ok_or_else(|| Error::Protocol(format!("Reply too short: {last}")))?;
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))?;

    // Message text follows the code and separator (e.g., "250-" or "250 ")
    let message = lines
        .iter()
        .map(|line| line.get(4..).unwrap_or_default().to_string())
        .collect();

    Ok(Reply::new(ReplyCode::new(code), message))
}
