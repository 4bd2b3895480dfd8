//! Background reclamation of finished session slots.
//!
//! Sessions flag their own slot pending and return; this task polls the
//! pool, aborts whatever is left of each pending task, awaits it and
//! frees the slot. Abort is a no-op on a task that already returned; for
//! a session displaced mid-read it is the only teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pool::SessionPool;

/// Runs one reclamation pass over the pool.
pub async fn reap(pool: &SessionPool) {
    for pending in pool.take_pending() {
        if let Some(task) = pending.task {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!(
                    slot = pending.index,
                    session = pending.session,
                    error = %e,
                    "Session task ended abnormally"
                ),
            }
        }

        pool.mark_free(pending.index);
        info!(
            slot = pending.index,
            session = pending.session,
            peer = ?pending.peer,
            "Session slot reclaimed"
        );
    }
}

/// Spawns the reaper task.
///
/// Polls on `period`. Uses cooperative shutdown via CancellationToken;
/// slots still pending at shutdown are left to process exit.
pub fn spawn_reaper_task(
    pool: Arc<SessionPool>,
    period: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);

        info!(interval_secs = period.as_secs(), "Session reaper started");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Session reaper shutting down");
                    break;
                }

                _ = tick.tick() => {
                    reap(&pool).await;
                }
            }
        }

        debug!("Session reaper task completed");
    })
}
