//! One complete delivery over an established stream.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::connection::Client;
use crate::error::{Error, Result};
use crate::header::find_header;
use crate::types::Address;

/// Recipient headers, scanned in this fixed order.
pub const RECIPIENT_HEADERS: [&str; 3] = ["to:", "cc:", "bcc:"];

/// Gathers every valid recipient address from the message headers.
///
/// `To:`, `Cc:` and `Bcc:` are scanned in that order; within a header,
/// addresses keep their order of appearance.
#[must_use]
pub fn recipients(message: &[u8]) -> Vec<Address> {
    let mut out = Vec::new();
    for name in RECIPIENT_HEADERS {
        if let Some(value) = find_header(message, name) {
            out.extend(value.addresses());
        }
    }
    out
}

/// Delivers one message over the given stream.
///
/// Runs the fixed session sequence: greeting, EHLO, AUTH LOGIN, MAIL FROM,
/// one RCPT TO per recipient, DATA with the message bytes verbatim plus the
/// `\r\n.\r\n` terminator, then QUIT. The first non-positive reply aborts
/// the whole delivery; a failed recipient is never skipped. The stream is
/// closed exactly once on every path, by drop.
///
/// # Errors
///
/// Returns an error on any protocol, authentication or I/O failure, or when
/// the message carries no valid recipient address. QUIT failures are
/// ignored.
pub async fn deliver<S>(
    stream: S,
    ehlo_hostname: &str,
    username: &str,
    password: &str,
    from: Address,
    message: &[u8],
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut rcpts = recipients(message).into_iter();
    let Some(first) = rcpts.next() else {
        return Err(Error::NoRecipients);
    };

    let client = Client::from_stream(stream).await?;
    let client = client.ehlo(ehlo_hostname).await?;
    let client = client.auth_login(username, password).await?;

    debug!(from = %from, "starting mail transaction");
    let client = client.mail_from(from).await?;
    let mut client = client.rcpt_to(first).await?;
    for to in rcpts {
        client = client.rcpt_to(to).await?;
    }

    let client = client.data().await?;
    let client = client.send_message(message).await?;
    client.quit().await;
    Ok(())
}
