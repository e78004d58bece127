//! Shared admission and shutdown state.
//!
//! One [`ServerState`] exists per server instance. The acceptor and every
//! connection handler hold it through an `Arc` and coordinate only through
//! the capability surface exposed here:
//!
//! * [`ServerState::try_admit_slot`] / [`SlotGuard`] - occupancy accounting
//! * [`ServerState::request_shutdown`] / [`ServerState::is_shutting_down`] - the shutdown flag
//! * [`ServerState::shutdown_signal`] - push notification of the shutdown flag
//!
//! Occupancy is only ever increased by a successful admission and only ever
//! decreased by dropping the matching [`SlotGuard`], so the counter cannot
//! drift and can never exceed the configured capacity.

use crate::connection::ConnectionId;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

/// Process-wide counters and flags shared by the acceptor and all handlers.
#[derive(Debug)]
pub struct ServerState {
    /// Maximum number of concurrently admitted connections
    capacity: usize,

    /// Admitted, not-yet-released connections
    occupancy: AtomicUsize,

    /// Highest occupancy observed since construction
    peak_occupancy: AtomicUsize,

    /// Lifetime count of admissions
    total_admitted: AtomicU64,

    /// Lifetime count of releases
    total_released: AtomicU64,

    /// Atomic counter for generating unique connection IDs
    next_id: AtomicUsize,

    /// Monotonic shutdown flag, false -> true at most once
    shutting_down: AtomicBool,

    /// Pushes the shutdown flag to tasks parked in I/O
    shutdown_tx: watch::Sender<bool>,

    /// Woken on every slot release
    released: Notify,
}

impl ServerState {
    /// Creates state for a server admitting at most `capacity` connections.
    pub fn new(capacity: usize) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            capacity,
            occupancy: AtomicUsize::new(0),
            peak_occupancy: AtomicUsize::new(0),
            total_admitted: AtomicU64::new(0),
            total_released: AtomicU64::new(0),
            next_id: AtomicUsize::new(1),
            shutting_down: AtomicBool::new(false),
            shutdown_tx,
            released: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Acquire)
    }

    /// Returns true while at least one slot is free.
    pub fn has_capacity(&self) -> bool {
        self.occupancy() < self.capacity
    }

    /// Claims one slot if the server is below capacity.
    ///
    /// The increment is a compare-and-swap against the capacity, so
    /// concurrent callers can never push occupancy past the limit. The
    /// returned guard releases the slot when dropped.
    pub fn try_admit_slot(self: &Arc<Self>) -> Option<SlotGuard> {
        let mut current = self.occupancy.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return None;
            }
            match self.occupancy.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.peak_occupancy.fetch_max(current + 1, Ordering::Relaxed);
        self.total_admitted.fetch_add(1, Ordering::Relaxed);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        Some(SlotGuard {
            state: Arc::clone(self),
            id,
        })
    }

    /// Gives back one slot. Only reachable through [`SlotGuard`].
    fn release_slot(&self, id: ConnectionId) {
        let previous = self.occupancy.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "slot released while occupancy was zero");
        self.total_released.fetch_add(1, Ordering::Relaxed);
        debug!("🔓 Slot of connection {} released ({} remaining)", id, previous - 1);
        self.released.notify_waiters();
    }

    /// Sets the shutdown flag and wakes every task waiting on it.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// later calls are no-ops.
    pub fn request_shutdown(&self) -> bool {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shutdown_tx.send_replace(true);
        info!("🛑 Shutdown requested - no new clients will be admitted");
        true
    }

    /// Non-blocking read of the shutdown flag.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Returns a receiver that resolves once shutdown has been requested.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.shutdown_tx.subscribe(),
        }
    }

    /// Waits until a slot is free, a release happens, or `backoff` elapses.
    ///
    /// The backoff bounds admission latency even if a notification is
    /// missed; callers must re-check capacity afterwards.
    pub async fn wait_for_slot(&self, backoff: Duration) {
        let notified = self.released.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.has_capacity() {
            return;
        }
        let _ = tokio::time::timeout(backoff, notified).await;
    }

    /// Resolves once every admitted connection has been released.
    pub async fn drained(&self) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.occupancy() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            capacity: self.capacity,
            occupancy: self.occupancy(),
            peak_occupancy: self.peak_occupancy.load(Ordering::Relaxed),
            total_admitted: self.total_admitted.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            shutting_down: self.is_shutting_down(),
        }
    }
}

/// Proof of one admitted slot.
///
/// Dropping the guard releases the slot exactly once, on every path
/// including panics unwinding through the owning task.
#[derive(Debug)]
pub struct SlotGuard {
    state: Arc<ServerState>,
    id: ConnectionId,
}

impl SlotGuard {
    /// Identifier assigned to the connection occupying this slot.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Releases the slot now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.state.release_slot(self.id);
    }
}

/// Receiver side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown has been requested.
    pub async fn wait(&mut self) {
        // Closed channel means the state was dropped; treat as shutdown.
        let _ = self.receiver.wait_for(|requested| *requested).await;
    }

    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Serializable view of [`ServerState`] for periodic reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub capacity: usize,
    pub occupancy: usize,
    pub peak_occupancy: usize,
    pub total_admitted: u64,
    pub total_released: u64,
    pub shutting_down: bool,
}
