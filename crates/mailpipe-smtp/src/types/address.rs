//! Email address type.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope.
///
/// The acceptance rule is deliberately loose: a token qualifies when it
/// contains an `@` that is not the first character and has at least one
/// character after it. Anything stricter would reject addresses that real
/// submission servers accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        if Self::is_valid(&addr) {
            Ok(Self(addr))
        } else {
            Err(Error::InvalidAddress(addr))
        }
    }

    /// Creates an address from an extracted header token, if it qualifies.
    ///
    /// Unlike [`Address::new`] this reports no error; header values are full
    /// of display-name words and comments that simply are not addresses, and
    /// those are skipped silently.
    #[must_use]
    pub fn from_token(token: &[u8]) -> Option<Self> {
        let token = std::str::from_utf8(token).ok()?;
        if Self::is_valid(token) {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(addr: &str) -> bool {
        matches!(addr.find('@'), Some(at) if at > 0 && at + 1 < addr.len())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
