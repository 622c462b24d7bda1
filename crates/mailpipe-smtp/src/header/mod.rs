//! Raw message header scanner.
//!
//! Operates directly on the captured message bytes; no MIME awareness. A
//! header is located by a case-insensitive line-prefix match (`"to:"`), and
//! its value span covers any RFC 2822 folded continuation lines (lines
//! beginning with whitespace).

use crate::types::Address;

/// Characters that separate address tokens inside a header value.
const DELIMITERS: &[u8] = b"<>()%!~* \t\r\n,\"'";

/// A borrowed view of one header's value span, folding included.
///
/// The span starts right after the `name:` prefix and keeps its interior
/// newlines; the address extractor treats those as delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderValue<'a> {
    bytes: &'a [u8],
}

impl<'a> HeaderValue<'a> {
    /// Returns the raw value span.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Byte-wise, case-sensitive, un-anchored substring search.
    ///
    /// This is the routing-table match: a pattern found anywhere in the
    /// value, display names included, counts. An empty pattern matches
    /// nothing.
    #[must_use]
    pub fn contains(&self, pattern: &[u8]) -> bool {
        !pattern.is_empty() && self.bytes.windows(pattern.len()).any(|w| w == pattern)
    }

    /// Returns an iterator over the valid addresses in the value.
    #[must_use]
    pub const fn addresses(&self) -> Addresses<'a> {
        Addresses { rest: self.bytes }
    }
}

/// Iterator over the addresses of a header value.
///
/// Tokens are cut on the delimiter set; tokens that fail the `@` rule
/// (display-name words, comments) are skipped silently.
#[derive(Debug, Clone)]
pub struct Addresses<'a> {
    rest: &'a [u8],
}

impl Iterator for Addresses<'_> {
    type Item = Address;

    fn next(&mut self) -> Option<Address> {
        loop {
            let start = self.rest.iter().position(|&b| !is_delimiter(b))?;
            let token_start = &self.rest[start..];
            let end = token_start
                .iter()
                .position(|&b| is_delimiter(b))
                .unwrap_or(token_start.len());
            self.rest = &token_start[end..];

            if let Some(addr) = Address::from_token(&token_start[..end]) {
                return Some(addr);
            }
        }
    }
}

/// Finds a header by its `name:` prefix and returns its value span.
///
/// Scans line by line from the start of the message; the match is
/// case-insensitive. Returns `None` when the header block ends (an empty
/// line) or the message is exhausted first.
#[must_use]
pub fn find_header<'a>(message: &'a [u8], name: &str) -> Option<HeaderValue<'a>> {
    let name = name.as_bytes();
    let mut pos = 0;
    while pos < message.len() {
        let line = &message[pos..];
        if line.starts_with(b"\n") || line.starts_with(b"\r\n") {
            return None;
        }
        if line.len() >= name.len() && line[..name.len()].eq_ignore_ascii_case(name) {
            let start = pos + name.len();
            let len = folded_extent(&message[start..]);
            return Some(HeaderValue {
                bytes: &message[start..start + len],
            });
        }
        pos += line.iter().position(|&b| b == b'\n')? + 1;
    }
    None
}

/// Length of a header value including folded continuation lines.
///
/// Extends across every immediately following line that begins with a space
/// or tab, stopping at the first non-folded line or end of buffer. The
/// terminating newline stays inside the span.
fn folded_extent(bytes: &[u8]) -> usize {
    let mut pos = 0;
    while let Some(i) = bytes[pos..].iter().position(|&b| b == b'\n') {
        pos += i + 1;
        match bytes.get(pos) {
            Some(b' ' | b'\t') => {}
            _ => return pos,
        }
    }
    bytes.len()
}

fn is_delimiter(b: u8) -> bool {
    DELIMITERS.contains(&b)
}
