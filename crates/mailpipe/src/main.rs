//! `mailpipe` - minimal outbound SMTP relay.
//!
//! Reads one complete RFC 2822 message from standard input, routes it
//! through the first configured account whose pattern matches the `From:`
//! header, and submits it to that account's server over an authenticated,
//! optionally TLS-encrypted connection. Meant to be invoked as a
//! mail-transport-agent replacement (e.g. from a local MTA's pipe hook).
//!
//! Exit status is `0` on full successful delivery, non-zero on any failure.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailpipe_smtp::connection::{SmtpStream, connect, connect_tls};
use mailpipe_smtp::{Address, deliver};

use config::{Account, Config, Security};

/// Largest message accepted from standard input.
const MAX_MESSAGE_LEN: usize = 8 * 1024 * 1024;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpipe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("delivery failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::load()?;
    let message = read_message(tokio::io::stdin()).await?;

    let account = config
        .select_account(&message)
        .context("no account matches the From: header")?;
    let from = Address::new(account.from_pattern.clone())?;

    info!(
        server = %account.server,
        port = account.port,
        from = %from,
        "delivering message"
    );

    let stream = open_stream(account).await?;
    deliver(
        stream,
        &config.hostname,
        &account.user,
        &account.pass,
        from,
        &message,
    )
    .await?;

    info!("message delivered");
    Ok(())
}

/// Opens the transport the account calls for: plain TCP or implicit TLS.
async fn open_stream(account: &Account) -> Result<SmtpStream> {
    let stream = match account.security {
        Security::Tls => connect_tls(&account.server, account.port, account.cert.as_deref()).await,
        Security::None => connect(&account.server, account.port).await,
    }
    .with_context(|| format!("connecting to {}:{}", account.server, account.port))?;
    debug!(tls = stream.is_tls(), "connection established");
    Ok(stream)
}

/// Captures the whole message from standard input, bounded by
/// [`MAX_MESSAGE_LEN`]. Oversize or empty input is fatal, not truncated.
async fn read_message<R>(input: R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut message = Vec::new();
    input
        .take(MAX_MESSAGE_LEN as u64 + 1)
        .read_to_end(&mut message)
        .await
        .context("reading message from standard input")?;

    if message.is_empty() {
        bail!("no message on standard input");
    }
    if message.len() > MAX_MESSAGE_LEN {
        bail!("message exceeds the {MAX_MESSAGE_LEN} byte input limit");
    }
    Ok(message)
}
