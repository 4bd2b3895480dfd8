//! Thermostat monitor client - interactive command prompt
//!
//! Connects to a running tstatd and relays operator command lines.
//!
//! # Usage
//!
//! ```text
//! tstat                    # connect to 127.0.0.1:8782 (or $TSTAT_ADDR)
//! tstat 192.168.7.2:8782   # connect to a specific daemon
//! ```
//!
//! `s`, `l` and `d` write the setpoint, limit and deadband, `? s|l|d|t`
//! reads them back (`t` is the current temperature), `q` ends the
//! session.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

use tstat_protocol::{parse_line, Command};
use tstatd::config::{ADDR_ENV_VAR, DEFAULT_LISTEN_ADDR};

/// How long to wait for a reply before giving the prompt back.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// CLI Arguments
// ============================================================================

/// Thermostat monitor client
#[derive(Parser, Debug)]
#[command(name = "tstat", version, about)]
struct Args {
    /// Daemon address (default: $TSTAT_ADDR, then 127.0.0.1:8782)
    addr: Option<SocketAddr>,
}

fn resolve_addr(args: &Args) -> Result<SocketAddr> {
    if let Some(addr) = args.addr {
        return Ok(addr);
    }

    if let Ok(raw) = std::env::var(ADDR_ENV_VAR) {
        return raw
            .parse()
            .with_context(|| format!("Invalid {ADDR_ENV_VAR}: {raw}"));
    }

    Ok(DEFAULT_LISTEN_ADDR)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let addr = resolve_addr(&args)?;

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {addr}"))?;

    println!("Connected to {addr}. Enter commands, 'q' to quit.");

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    let mut reply = [0u8; 1024];

    loop {
        print!("CLIENT> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line).await? == 0 {
            // stdin EOF: tell the daemon the session is over.
            let _ = stream.write_all(b"q\n").await;
            break;
        }

        // Lines with nothing the daemon would answer are not worth the
        // round trip.
        let commands = parse_line(&line);
        if commands.is_empty() {
            continue;
        }

        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;

        let quitting = commands.iter().any(|c| matches!(c, Command::Quit));
        let expects_reply = commands.iter().any(|c| !matches!(c, Command::Quit));

        if expects_reply {
            match timeout(REPLY_TIMEOUT, stream.read(&mut reply)).await {
                Ok(Ok(0)) => {
                    println!("Server closed the connection.");
                    break;
                }
                Ok(Ok(n)) => println!("{}", String::from_utf8_lossy(&reply[..n])),
                Ok(Err(e)) => return Err(e).context("Read failed"),
                Err(_) => println!("No reply within {REPLY_TIMEOUT:?}."),
            }
        }

        if quitting {
            break;
        }
    }

    Ok(())
}
