//! Integration tests for the SMTP session driver.
//!
//! These tests use a mock stream with scripted server replies, so the full
//! delivery sequence runs without a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailpipe_smtp::{Address, Client, Error, deliver};

/// Mock stream that returns predefined replies and captures writes.
struct MockStream {
    /// Replies to return (in order).
    replies: Cursor<Vec<u8>>,
    /// Commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
    /// Total bytes accepted before writes start returning `Ok(0)`.
    write_limit: Option<usize>,
}

impl MockStream {
    fn new(replies: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            replies: Cursor::new(replies.to_vec()),
            sent: Arc::clone(&sent),
            write_limit: None,
        };
        (stream, sent)
    }

    /// A stream whose writes dry up after `limit` bytes, like a peer that
    /// stopped draining its receive window.
    fn with_write_limit(replies: &[u8], limit: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let (mut stream, sent) = Self::new(replies);
        stream.write_limit = Some(limit);
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.replies.get_ref();
        let pos = usize::try_from(self.replies.position()).unwrap();

        if pos >= data.len() {
            // EOF: the scripted conversation is over
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.replies.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut sent = self.sent.lock().unwrap();
        let room = self
            .write_limit
            .map_or(buf.len(), |limit| limit.saturating_sub(sent.len()));
        let n = buf.len().min(room);
        sent.extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

const MESSAGE: &[u8] = b"From: me@myserver.sth\r\n\
To: a@x.com, b@y.com\r\n\
Subject: hello\r\n\
\r\n\
First line.\r\n\
Second line.\r\n";

fn happy_path_replies() -> Vec<u8> {
    [
        "220 smtp.myserver.sth ESMTP ready\r\n",
        "250 smtp.myserver.sth\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 Authentication successful\r\n",
        "250 OK\r\n", // MAIL FROM
        "250 OK\r\n", // RCPT a@x.com
        "250 OK\r\n", // RCPT b@y.com
        "354 End data with <CR><LF>.<CR><LF>\r\n",
        "250 OK: queued\r\n",
        "221 Bye\r\n",
    ]
    .concat()
    .into_bytes()
}

async fn run_delivery(replies: Vec<u8>) -> (Result<(), Error>, Vec<u8>) {
    let (stream, sent) = MockStream::new(&replies);
    let from = Address::new("me@myserver.sth").unwrap();
    let result = deliver(stream, "clienthost", "me", "pass", from, MESSAGE).await;
    let sent = sent.lock().unwrap().clone();
    (result, sent)
}

#[tokio::test]
async fn test_full_delivery() {
    let (result, sent) = run_delivery(happy_path_replies()).await;
    assert!(result.is_ok());

    let expected = b"EHLO clienthost\r\n\
AUTH LOGIN\r\n\
bWU=\r\n\
cGFzcw==\r\n\
MAIL FROM:<me@myserver.sth>\r\n\
RCPT TO:<a@x.com>\r\n\
RCPT TO:<b@y.com>\r\n\
DATA\r\n"
        .iter()
        .chain(MESSAGE)
        .chain(b"\r\n.\r\n".iter())
        .chain(b"QUIT\r\n".iter())
        .copied()
        .collect::<Vec<u8>>();
    assert_eq!(
        String::from_utf8_lossy(&sent),
        String::from_utf8_lossy(&expected)
    );
}

#[tokio::test]
async fn test_ehlo_multiline_reply() {
    let replies = [
        "220 ready\r\n",
        "250-smtp.myserver.sth\r\n",
        "250-AUTH LOGIN PLAIN\r\n",
        "250 8BITMIME\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 ok\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go ahead\r\n",
        "250 queued\r\n",
        "221 bye\r\n",
    ]
    .concat()
    .into_bytes();

    let (result, sent) = run_delivery(replies).await;
    assert!(result.is_ok());
    // The multi-line EHLO reply is fully drained before AUTH is sent
    let sent = String::from_utf8_lossy(&sent);
    assert_eq!(sent.matches("AUTH LOGIN\r\n").count(), 1);
}

#[tokio::test]
async fn test_rcpt_failure_aborts_before_data() {
    let replies = [
        "220 ready\r\n",
        "250 smtp.myserver.sth\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 ok\r\n",
        "250 ok\r\n", // MAIL FROM
        "250 ok\r\n", // RCPT a@x.com
        "550 No such user\r\n",
    ]
    .concat()
    .into_bytes();

    let (result, sent) = run_delivery(replies).await;
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Smtp { code: 550, .. }));
    assert!(err.is_permanent());

    let sent = String::from_utf8_lossy(&sent);
    assert_eq!(sent.matches("RCPT TO:").count(), 2);
    assert!(!sent.contains("DATA"));
}

#[tokio::test]
async fn test_greeting_failure() {
    let replies = b"554 Go away\r\n".to_vec();
    let (result, sent) = run_delivery(replies).await;
    assert!(matches!(result, Err(Error::Smtp { code: 554, .. })));
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_auth_failure() {
    let replies = [
        "220 ready\r\n",
        "250 smtp.myserver.sth\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "535 Authentication credentials invalid\r\n",
    ]
    .concat()
    .into_bytes();

    let (result, sent) = run_delivery(replies).await;
    assert!(matches!(result, Err(Error::Smtp { code: 535, .. })));
    assert!(!String::from_utf8_lossy(&sent).contains("MAIL FROM"));
}

#[tokio::test]
async fn test_stream_closed_mid_reply() {
    // Server disappears after the greeting
    let replies = b"220 ready\r\n".to_vec();
    let (result, _sent) = run_delivery(replies).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_no_recipients_fails_without_io() {
    let message = b"From: me@myserver.sth\r\nSubject: empty\r\n\r\nbody\r\n";
    let (stream, sent) = MockStream::new(b"");
    let from = Address::new("me@myserver.sth").unwrap();
    let result = deliver(stream, "clienthost", "me", "pass", from, message).await;
    assert!(matches!(result, Err(Error::NoRecipients)));
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_overlong_reply_line_is_rejected() {
    // A greeting line that never terminates must not be buffered forever
    let replies = vec![b'2'; 5000];
    let (result, sent) = run_delivery(replies).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_short_write_during_data_fails_delivery() {
    // Server accepts everything through DATA, then stops draining writes
    let replies = [
        "220 ready\r\n",
        "250 smtp.myserver.sth\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 ok\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go ahead\r\n",
    ]
    .concat()
    .into_bytes();

    // Every command fits under the limit; the message body does not
    let (stream, sent) = MockStream::with_write_limit(&replies, 130);
    let from = Address::new("me@myserver.sth").unwrap();
    let result = deliver(stream, "clienthost", "me", "pass", from, MESSAGE).await;
    assert!(matches!(result, Err(Error::WriteShortfall)));

    let sent = String::from_utf8_lossy(&sent.lock().unwrap().clone()).into_owned();
    assert!(sent.contains("DATA\r\n"));
    assert!(!sent.ends_with("\r\n.\r\n"));
}

#[tokio::test]
async fn test_quit_reply_failure_is_ignored() {
    // Identical to the happy path but the QUIT reply never arrives
    let replies = happy_path_replies();
    let replies = replies[..replies.len() - b"221 Bye\r\n".len()].to_vec();
    let (result, _sent) = run_delivery(replies).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_client_greeting() {
    let (stream, _sent) = MockStream::new(b"220 smtp.example.com ESMTP ready\r\n");
    let client = Client::from_stream(stream).await;
    assert!(client.is_ok());
}
