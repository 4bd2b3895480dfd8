//! Per-connection session handler.
//!
//! Each session reads command lines, applies every command on the line in
//! order and writes one reply per set or query. Replies carry no newline
//! or other framing; the interactive client prints whatever bytes arrive.
//! However a session ends (quit, EOF, I/O error, oversized line), it
//! flags its own slot pending and leaves reclamation to the reaper.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use tstat_core::ParameterStore;
use tstat_protocol::{parse_line, Command, QueryTarget, Response};

use crate::control::SharedTemperature;
use crate::pool::SessionPool;

/// Longest accepted command line in bytes.
pub const MAX_COMMAND_LINE: usize = 1024;

/// Errors that can occur during session handling.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command line too long: {length} bytes (max: {max})")]
    LineTooLong { length: usize, max: usize },
}

/// One operator connection.
pub struct MonitorSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    store: Arc<ParameterStore>,
    temperature: SharedTemperature,
    pool: Arc<SessionPool>,
    slot: usize,
    session: u64,
}

impl MonitorSession {
    pub fn new(
        stream: TcpStream,
        store: Arc<ParameterStore>,
        temperature: SharedTemperature,
        pool: Arc<SessionPool>,
        slot: usize,
        session: u64,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
            store,
            temperature,
            pool,
            slot,
            session,
        }
    }

    /// Runs the session to completion.
    pub async fn run(mut self) {
        debug!(slot = self.slot, session = self.session, "Session started");

        match self.process().await {
            Ok(()) => debug!(slot = self.slot, session = self.session, "Session ended"),
            Err(e) => warn!(
                slot = self.slot,
                session = self.session,
                error = %e,
                "Session ended on error"
            ),
        }

        // Quit, EOF and errors all converge here; the reaper does the rest.
        self.pool.mark_pending(self.slot);
    }

    /// Command loop: read a line, run its commands, repeat.
    async fn process(&mut self) -> Result<(), SessionError> {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                debug!(session = self.session, "Client closed the connection");
                return Ok(());
            }

            if line.len() > MAX_COMMAND_LINE {
                return Err(SessionError::LineTooLong {
                    length: line.len(),
                    max: MAX_COMMAND_LINE,
                });
            }

            debug!(session = self.session, line = %line.trim_end(), "Line received");

            for command in parse_line(&line) {
                match command {
                    Command::Set(parameter, value) => {
                        self.store.set(parameter, value);
                        info!(
                            session = self.session,
                            parameter = parameter.name(),
                            value,
                            "Parameter written"
                        );
                        self.reply(Response::Ok).await?;
                    }

                    Command::Query(target) => {
                        let value = self.lookup(target);
                        debug!(
                            session = self.session,
                            target = target.name(),
                            value,
                            "Parameter read"
                        );
                        self.reply(Response::Value(value)).await?;
                    }

                    // No reply; the connection just closes.
                    Command::Quit => {
                        info!(session = self.session, "Client quit");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Resolves a query target against the store or the shared sample.
    fn lookup(&self, target: QueryTarget) -> i64 {
        let params = self.store.get();
        match target {
            QueryTarget::Setpoint => params.setpoint,
            QueryTarget::Limit => params.limit,
            QueryTarget::Deadband => params.deadband,
            QueryTarget::Temperature => self.temperature.load(Ordering::Relaxed),
        }
    }

    async fn reply(&mut self, response: Response) -> Result<(), SessionError> {
        self.writer.write_all(response.render().as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
