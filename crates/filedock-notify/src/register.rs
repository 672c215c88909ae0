//! Process-wide change register
//!
//! The register records when the storage root last changed and holds the
//! polls that are currently suspended waiting for the next change.
//!
//! ```text
//!   poll (since)                     upload / delete
//!       │                                  │
//!       ▼                                  ▼
//!  register(since) ──► lock ◄────────── notify()
//!       │              │  last_change_at = next timestamp
//!       │              │  drained = take(waiters)
//!       │              └─ unlock
//!       │                                  │
//!       ▼                                  ▼
//!   WaiterTicket ◄──── oneshot ──── PendingWaiter::release()
//! ```
//!
//! The staleness check and the registration happen under the same lock that
//! `notify()` holds while it advances the timestamp and drains the list, so a
//! mutation can never slip in between a poll's check and its registration.
//! The lock is never held across an `.await`.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Identifies one registered waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

impl std::fmt::Display for WaiterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "waiter-{}", self.0)
    }
}

/// A suspended poll, owned by the register until it is released or withdrawn.
///
/// Releasing consumes the waiter, so it can be released at most once.
#[derive(Debug)]
pub struct PendingWaiter {
    id: WaiterId,
    release: oneshot::Sender<()>,
}

impl PendingWaiter {
    /// The waiter's identifier
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Wakes the suspended poll.
    ///
    /// Returns false if the poll was already gone (its client disconnected
    /// or its timer fired), in which case the release is a no-op.
    pub fn release(self) -> bool {
        self.release.send(()).is_ok()
    }
}

/// Result of [`ChangeRegister::register`]
#[derive(Debug)]
pub enum Registration {
    /// The caller's timestamp is already behind; nothing was registered.
    Stale {
        /// The register's current timestamp
        last_change_at: i64,
    },
    /// The caller is now waiting for the next change.
    Waiting(WaiterTicket),
}

/// The poll side of a registered waiter.
///
/// Dropping the ticket withdraws the waiter if it is still registered, so an
/// abandoned poll does not linger until the next mutation.
#[derive(Debug)]
pub struct WaiterTicket {
    id: WaiterId,
    receiver: Option<oneshot::Receiver<()>>,
    register: Arc<ChangeRegister>,
}

impl WaiterTicket {
    /// The waiter's identifier
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Takes the receiving half. Resolves when the waiter is released.
    ///
    /// Returns `None` if it was already taken.
    pub fn take_receiver(&mut self) -> Option<oneshot::Receiver<()>> {
        self.receiver.take()
    }

    /// Removes the waiter from the register.
    ///
    /// Returns true if this call removed it. False means a `notify()` already
    /// drained it, i.e. the change won the race.
    pub fn withdraw(&self) -> bool {
        self.register.withdraw(self.id)
    }
}

impl Drop for WaiterTicket {
    fn drop(&mut self) {
        if self.register.withdraw(self.id) {
            trace!(waiter = %self.id, "withdrew abandoned waiter");
        }
    }
}

/// What a call to [`ChangeRegister::notify`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// The new last-change timestamp
    pub timestamp: i64,
    /// Waiters that were drained from the register
    pub drained: usize,
    /// Of those, the ones whose poll was still listening
    pub released: usize,
}

#[derive(Debug)]
struct RegisterState {
    last_change_at: i64,
    waiters: Vec<PendingWaiter>,
}

/// Last-change timestamp plus the set of suspended polls.
///
/// One instance is created at startup and shared (`Arc`) by every request
/// handler for the lifetime of the process.
#[derive(Debug)]
pub struct ChangeRegister {
    state: Mutex<RegisterState>,
    next_id: AtomicU64,
}

impl ChangeRegister {
    /// Create a register whose last change is "now".
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(now_millis())
    }

    /// Create a register with an explicit initial timestamp (epoch ms).
    #[must_use]
    pub fn starting_at(last_change_at: i64) -> Self {
        Self {
            state: Mutex::new(RegisterState {
                last_change_at,
                waiters: Vec::new(),
            }),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegisterState> {
        // Every critical section leaves the state consistent, so a panic in
        // another holder does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timestamp (epoch ms) of the last successful mutation
    pub fn last_change_at(&self) -> i64 {
        self.lock().last_change_at
    }

    /// Number of polls currently suspended
    pub fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Checks `since` against the last change and, if it is current,
    /// registers a new waiter.
    ///
    /// `since < last_change_at` means the caller missed a change and gets
    /// [`Registration::Stale`] without registering.
    pub fn register(self: &Arc<Self>, since: i64) -> Registration {
        let mut state = self.lock();

        if since < state.last_change_at {
            return Registration::Stale {
                last_change_at: state.last_change_at,
            };
        }

        let id = WaiterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (release, receiver) = oneshot::channel();
        state.waiters.push(PendingWaiter { id, release });
        trace!(waiter = %id, waiting = state.waiters.len(), "registered waiter");
        drop(state);

        Registration::Waiting(WaiterTicket {
            id,
            receiver: Some(receiver),
            register: Arc::clone(self),
        })
    }

    /// Removes a waiter without releasing it.
    ///
    /// Returns false if it is no longer registered.
    pub fn withdraw(&self, id: WaiterId) -> bool {
        let mut state = self.lock();
        match state.waiters.iter().position(|w| w.id == id) {
            Some(idx) => {
                state.waiters.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Records a mutation and releases every waiter registered before it.
    ///
    /// The timestamp is advanced and the waiter list swapped out under the
    /// lock; the drained waiters are released after it is dropped. Waiters
    /// registering after the swap see the new timestamp and wait for the
    /// next notification.
    pub fn notify(&self) -> NotifyOutcome {
        let (timestamp, drained) = {
            let mut state = self.lock();
            state.last_change_at = next_timestamp(state.last_change_at, now_millis());
            (state.last_change_at, std::mem::take(&mut state.waiters))
        };

        let drained_count = drained.len();
        let released = drained
            .into_iter()
            .map(PendingWaiter::release)
            .filter(|delivered| *delivered)
            .count();

        debug!(
            timestamp,
            drained = drained_count,
            released,
            "change notified"
        );

        NotifyOutcome {
            timestamp,
            drained: drained_count,
            released,
        }
    }
}

impl Default for ChangeRegister {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Strictly increasing successor of `previous`, tracking the wall clock.
fn next_timestamp(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}
