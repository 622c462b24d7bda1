//! Account routing table.
//!
//! Loaded once at startup and never mutated. A message is routed through the
//! first account whose `from_pattern` occurs inside the message's `From:`
//! header value; the match is a plain byte-wise substring, not a structured
//! address comparison, so a pattern may also hit inside a display name.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use mailpipe_smtp::header::find_header;

/// Security mode for the server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS, port 465).
    #[default]
    Tls,
}

/// One sending account.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Pattern matched against the message's `From:` header value. Also
    /// used as the envelope sender in `MAIL FROM`.
    pub from_pattern: String,
    /// SMTP server hostname.
    pub server: String,
    /// SMTP server port.
    pub port: u16,
    /// Username for AUTH LOGIN.
    pub user: String,
    /// Password for AUTH LOGIN.
    pub pass: String,
    /// Optional root-certificates PEM file for TLS verification.
    #[serde(default)]
    pub cert: Option<PathBuf>,
    /// Security mode (default: implicit TLS).
    #[serde(default)]
    pub security: Security,
}

/// Relay configuration: EHLO hostname plus the ordered account table.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Client hostname announced in EHLO.
    pub hostname: String,
    /// Routing table; first matching account wins.
    pub accounts: Vec<Account>,
}

impl Config {
    /// Loads the configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load() -> Result<Self> {
        let path = default_path().context("no configuration directory available")?;
        Self::load_from(&path)
    }

    /// Loads the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// contains no accounts.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing configuration from {}", path.display()))?;
        if config.accounts.is_empty() {
            bail!("account table in {} is empty", path.display());
        }
        Ok(config)
    }

    /// Picks the account whose pattern occurs in the `From:` header value.
    ///
    /// Returns `None` when the message has no `From:` header or no pattern
    /// matches; the caller treats that as fatal without connecting
    /// anywhere (defaulting to some account could relay through the wrong
    /// identity).
    #[must_use]
    pub fn select_account(&self, message: &[u8]) -> Option<&Account> {
        let from = find_header(message, "from:")?;
        self.accounts
            .iter()
            .find(|account| from.contains(account.from_pattern.as_bytes()))
    }
}

/// Default configuration path: `<config_dir>/mailpipe/config.json`.
fn default_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("mailpipe").join("config.json"))
}
