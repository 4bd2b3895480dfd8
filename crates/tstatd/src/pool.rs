//! Fixed-size session slot table.
//!
//! The monitor server books sessions into ten slots and walks the table
//! cyclically, not by looking for a free slot. Wrapping around onto a
//! still-live slot overwrites its bookkeeping and detaches the old task;
//! the server logs the displacement and carries on. The reaper is the
//! only component that returns slots to [`SlotState::Free`].
//!
//! One mutex guards the whole table. Every operation is a short,
//! non-blocking pass over plain data, so the lock is never held across an
//! await point.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

/// Number of concurrent session slots.
pub const SESSION_SLOTS: usize = 10;

/// Lifecycle position of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// No session booked.
    #[default]
    Free,

    /// A session task is (or was) running here.
    InUse,

    /// The session finished or failed and waits for the reaper.
    Pending,
}

impl SlotState {
    /// Lower-case state name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::InUse => "in-use",
            Self::Pending => "pending",
        }
    }
}

/// Bookkeeping for one slot.
#[derive(Debug, Default)]
struct Slot {
    state: SlotState,
    /// Session number of the current (or last) occupant. 0 means the slot
    /// has never been booked.
    session: u64,
    peer: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

/// Read-only copy of one slot's visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView {
    pub state: SlotState,
    pub session: u64,
}

/// A pending slot handed to the reaper, task included.
#[derive(Debug)]
pub struct PendingSession {
    pub index: usize,
    pub session: u64,
    pub peer: Option<SocketAddr>,
    pub task: Option<JoinHandle<()>>,
}

/// The slot table shared by the monitor server and the reaper.
#[derive(Debug)]
pub struct SessionPool {
    slots: Mutex<Vec<Slot>>,
}

impl SessionPool {
    /// Creates the standard ten-slot pool.
    pub fn new() -> Self {
        Self::with_slots(SESSION_SLOTS)
    }

    /// Creates a pool with a custom slot count.
    pub fn with_slots(count: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(count, Slot::default);
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// Number of slots in the table.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Books `session` into the slot at `index`, whatever the slot held.
    ///
    /// Returns the session number displaced from a non-free slot. The
    /// displaced task keeps running detached; only its bookkeeping is
    /// gone. Out-of-range indices book nothing.
    pub fn occupy(&self, index: usize, session: u64, peer: SocketAddr) -> Option<u64> {
        let mut slots = self.lock();
        let slot = slots.get_mut(index)?;

        let displaced = match slot.state {
            SlotState::Free => None,
            SlotState::InUse | SlotState::Pending => Some(slot.session),
        };

        slot.state = SlotState::InUse;
        slot.session = session;
        slot.peer = Some(peer);
        // Dropping a JoinHandle detaches the task.
        slot.task = None;

        displaced
    }

    /// Stores the join handle for the slot's session task.
    ///
    /// The slot is booked before the task is spawned, so a session that
    /// ends instantly still finds its own slot in-use when it flags
    /// itself pending.
    pub fn attach_task(&self, index: usize, task: JoinHandle<()>) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(index) {
            slot.task = Some(task);
        }
    }

    /// Flags the slot for the reaper. Unconditional; no check against the
    /// stored session number.
    pub fn mark_pending(&self, index: usize) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(index) {
            slot.state = SlotState::Pending;
            debug!(
                slot = index,
                session = slot.session,
                "Session slot flagged pending"
            );
        }
    }

    /// Returns the slot to the free list. The session number stays behind
    /// for diagnostics.
    pub fn mark_free(&self, index: usize) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(index) {
            slot.state = SlotState::Free;
            slot.peer = None;
            slot.task = None;
        }
    }

    /// Collects every pending slot, taking the join handles.
    ///
    /// The slots stay [`SlotState::Pending`] until the reaper finishes
    /// with them and calls [`SessionPool::mark_free`].
    pub fn take_pending(&self) -> Vec<PendingSession> {
        let mut slots = self.lock();
        slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.state == SlotState::Pending)
            .map(|(index, slot)| PendingSession {
                index,
                session: slot.session,
                peer: slot.peer,
                task: slot.task.take(),
            })
            .collect()
    }

    /// Copies the visible state of every slot.
    pub fn snapshot(&self) -> Vec<SlotView> {
        self.lock()
            .iter()
            .map(|slot| SlotView {
                state: slot.state,
                session: slot.session,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        // Slot bookkeeping survives a panicked holder; absorb the poison.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new()
    }
}
