//! Type-state SMTP client.

use std::io;
use std::marker::PhantomData;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use crate::MAX_LINE_LEN;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_reply_complete, parse_reply};
use crate::types::{Address, Reply};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
///
/// Generic over the stream so tests can drive it with a scripted mock. The
/// stream is owned for the whole session and closed exactly once when the
/// client is dropped, on success and on every failure path alike.
#[derive(Debug)]
pub struct Client<S, State> {
    reader: BufReader<S>,
    _state: PhantomData<State>,
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server
    /// rejects the session.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut reader = BufReader::new(stream);
        let greeting = read_reply(&mut reader).await?;
        if !greeting.is_positive() {
            return Err(Error::smtp(greeting.code.as_u16(), greeting.message_text()));
        }

        Ok(Self {
            reader,
            _state: PhantomData,
        })
    }

    /// Sends EHLO and drains the (possibly multi-line) capability reply.
    ///
    /// The advertised extensions are not inspected; this client speaks the
    /// base protocol plus AUTH LOGIN only.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.send_command(cmd).await?;

        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self)
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// Three exchanges: `AUTH LOGIN`, then the Base64-encoded username, then
    /// the Base64-encoded password. Every intermediate reply must be
    /// positive.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the exchange fails.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let reply = self.send_command(Command::AuthLogin).await?;
        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        let reply = self.send_credential(username.as_bytes()).await?;
        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        let reply = self.send_credential(password.as_bytes()).await?;
        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<S, MailTransaction>> {
        let reply = self.send_command(Command::MailFrom { from }).await?;

        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<S, RecipientAdded>> {
        let reply = self.send_command(Command::RcptTo { to }).await?;

        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to }).await?;

        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        let reply = self.send_command(Command::Data).await?;

        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the message content and completes the transaction.
    ///
    /// The captured message bytes are written verbatim, followed by the
    /// terminating `\r\n.\r\n` sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the write falls short or the server rejects the
    /// message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Connected>> {
        self.write_all(message).await?;
        self.write_all(b"\r\n.\r\n").await?;
        trace!(bytes = message.len(), "message data sent");

        let reply = read_reply(&mut self.reader).await?;
        if !reply.is_positive() {
            return Err(Error::smtp(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends QUIT and ends the session (available in any state).
    ///
    /// The server's reply is read and discarded; a failure here is
    /// irrelevant since the connection is closing either way.
    pub async fn quit(mut self) {
        let _ = self.send_command(Command::Quit).await;
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        let data = cmd.serialize();
        trace!(command = %String::from_utf8_lossy(&data).trim_end(), "smtp send");
        self.write_all(&data).await?;
        read_reply(&mut self.reader).await
    }

    /// Writes one Base64-encoded AUTH LOGIN credential line and reads the
    /// reply. The credential itself is never logged.
    async fn send_credential(&mut self, secret: &[u8]) -> Result<Reply> {
        let mut line = BASE64.encode(secret);
        line.push_str("\r\n");
        trace!(bytes = secret.len(), "smtp send credential");
        self.write_all(line.as_bytes()).await?;
        read_reply(&mut self.reader).await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.reader
            .get_mut()
            .write_all(data)
            .await
            .map_err(|err| match err.kind() {
                io::ErrorKind::WriteZero => Error::WriteShortfall,
                _ => Error::Io(err),
            })?;
        self.reader.get_mut().flush().await?;
        Ok(())
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            reader: self.reader,
            _state: PhantomData,
        }
    }
}

/// Reads one full SMTP reply, draining continuation lines until the final
/// `ddd ` line arrives. A closed stream or an over-long line while a reply
/// is pending is a protocol failure.
async fn read_reply<S>(reader: &mut BufReader<S>) -> Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let mut raw = Vec::new();
        let n = (&mut *reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut raw)
            .await?;
        if n == 0 {
            return Err(Error::Protocol(
                "Connection closed while awaiting reply".into(),
            ));
        }
        if raw.len() > MAX_LINE_LEN {
            return Err(Error::Protocol("Reply line too long".into()));
        }

        let line = String::from_utf8_lossy(&raw).into_owned();
        trace!(line = %line.trim_end(), "smtp reply");

        let complete = is_reply_complete(&line);
        lines.push(line.trim_end().to_string());
        if complete {
            break;
        }
    }

    parse_reply(&lines)
}
