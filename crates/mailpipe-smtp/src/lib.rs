//! # mailpipe-smtp
//!
//! A minimal SMTP submission client: the protocol half of the `mailpipe`
//! outbound relay.
//!
//! ## Features
//!
//! - **Type-state session management**: Compile-time enforcement of the
//!   fixed command sequence (greeting, EHLO, AUTH LOGIN, envelope, DATA,
//!   QUIT)
//! - **TLS support**: Implicit TLS (port 465) or plain TCP, with an
//!   optional per-server root-certificate file
//! - **Header scanning**: Locates `From`/`To`/`Cc`/`Bcc` headers in a raw
//!   RFC 2822 message, including folded continuation lines, and extracts
//!   recipient addresses from them
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpipe_smtp::connection::connect_tls;
//! use mailpipe_smtp::{Address, deliver};
//!
//! #[tokio::main]
//! async fn main() -> mailpipe_smtp::Result<()> {
//!     let message = b"From: me@example.com\r\nTo: you@example.org\r\n\r\nHi\r\n";
//!
//!     let stream = connect_tls("smtp.example.com", 465, None).await?;
//!     let from = Address::new("me@example.com")?;
//!     deliver(stream, "client.example.com", "me", "secret", from, message).await
//! }
//! ```
//!
//! ## Session States
//!
//! The client uses the type-state pattern so a delivery can only follow the
//! one valid command order:
//!
//! ```text
//! Connected ── auth_login() ──→ Authenticated ── mail_from() ──→
//! MailTransaction ── rcpt_to() ──→ RecipientAdded ── data() ──→ Data
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Streams and the type-state client
//! - [`header`]: Raw message header scanner
//! - [`parser`]: Reply framing and parsing
//! - [`types`]: Core SMTP types (addresses, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod deliver;
mod error;
pub mod header;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, SmtpStream,
};
pub use deliver::{RECIPIENT_HEADERS, deliver, recipients};
pub use error::{Error, Result};
pub use header::HeaderValue;
pub use types::{Address, Reply, ReplyCode};

/// Longest SMTP reply line the client will accept.
pub const MAX_LINE_LEN: usize = 4096;
