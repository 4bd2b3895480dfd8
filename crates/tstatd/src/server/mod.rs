//! TCP monitor server.
//!
//! The server:
//! - Binds one TCP listener at startup (a failed bind is fatal)
//! - Books each accepted connection into the session pool
//! - Spawns a MonitorSession task per client
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  MonitorServer  │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ MonitorSession  │────▶│  ParameterStore │
//! │  (per client)   │     │                 │
//! └───────┬─────────┘     └─────────────────┘
//!         │ mark_pending
//!         ▼
//! ┌─────────────────┐
//! │   SessionPool   │◀── SessionReaper
//! └─────────────────┘
//! ```
//!
//! Slots are assigned cyclically, not by scanning for a free one. With
//! ten slots, the eleventh connection lands back on slot 0 whatever that
//! slot holds; the displaced session keeps running detached and the
//! overwrite is logged.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the crate's panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and allow continued operation

mod session;

pub use session::{MonitorSession, SessionError, MAX_COMMAND_LINE};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tstat_core::ParameterStore;

use crate::control::SharedTemperature;
use crate::pool::SessionPool;

/// Errors that can occur while starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },
}

/// TCP server accepting operator monitor sessions.
pub struct MonitorServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    store: Arc<ParameterStore>,
    temperature: SharedTemperature,
    pool: Arc<SessionPool>,
    cancel_token: CancellationToken,
}

impl MonitorServer {
    /// Binds the listener and assembles the server.
    ///
    /// Binding happens exactly once, here. The daemon treats an error as
    /// fatal and exits.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<ParameterStore>,
        temperature: SharedTemperature,
        pool: Arc<SessionPool>,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::Bind {
            addr,
            error: e.to_string(),
        })?;

        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr,
            error: e.to_string(),
        })?;

        info!(
            addr = %local_addr,
            slots = pool.len(),
            "Monitor server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            store,
            temperature,
            pool,
            cancel_token,
        })
    }

    /// The address actually bound, which differs from the requested one
    /// when port 0 was asked for.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the cancellation token is triggered.
    pub async fn run(self) {
        let mut index = 0usize;
        let mut next_session = 0u64;

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Monitor server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            next_session += 1;
                            self.start_session(stream, peer, index, next_session);
                            index = (index + 1) % self.pool.len().max(1);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        info!("Monitor server stopped");
    }

    /// Books the slot and spawns the session task.
    fn start_session(&self, stream: TcpStream, peer: SocketAddr, index: usize, session: u64) {
        // The slot is booked before the task exists so a session that ends
        // instantly still finds itself in-use when it flags pending.
        if let Some(displaced) = self.pool.occupy(index, session, peer) {
            warn!(
                slot = index,
                session,
                displaced,
                "Slot still occupied; overwriting bookkeeping, old session runs detached"
            );
        }

        debug!(slot = index, session, peer = %peer, "Session accepted");

        let monitor = MonitorSession::new(
            stream,
            Arc::clone(&self.store),
            Arc::clone(&self.temperature),
            Arc::clone(&self.pool),
            index,
            session,
        );

        let task = tokio::spawn(monitor.run());
        self.pool.attach_task(index, task);
    }
}
