//! Long-poll resolution
//!
//! [`LongPoll::wait_for_change`] answers "has anything changed since `since`?",
//! suspending the caller until the next notification or the timeout,
//! whichever comes first.

use std::{sync::Arc, time::Duration};

use tracing::{debug, trace};

use crate::register::{ChangeRegister, Registration};

/// Default time a poll is held open without a change
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Answer to a long poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// True if a change happened after the caller's timestamp
    pub changed: bool,
    /// The register's timestamp when the poll resolved
    pub timestamp: i64,
}

/// Resolves long polls against a shared [`ChangeRegister`].
#[derive(Debug, Clone)]
pub struct LongPoll {
    register: Arc<ChangeRegister>,
    timeout: Duration,
}

impl LongPoll {
    /// Create a resolver with the given timeout
    pub fn new(register: Arc<ChangeRegister>, timeout: Duration) -> Self {
        Self { register, timeout }
    }

    /// The timeout applied to each poll
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits until the register changes after `since`, or the timeout elapses.
    ///
    /// Resolves immediately with `changed: true` if `since` is already behind.
    /// Otherwise the first of release and timeout decides the answer. When the
    /// timer fires but the waiter has already been drained by `notify()`, the
    /// change won and the answer is `true`.
    pub async fn wait_for_change(&self, since: i64) -> PollOutcome {
        let mut ticket = match self.register.register(since) {
            Registration::Stale { last_change_at } => {
                trace!(since, last_change_at, "poll already stale");
                return PollOutcome {
                    changed: true,
                    timestamp: last_change_at,
                };
            }
            Registration::Waiting(ticket) => ticket,
        };

        let Some(receiver) = ticket.take_receiver() else {
            return self.outcome(false);
        };

        let changed = match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(())) => true,
            // The sender only goes away without sending if the waiter was
            // dropped from the register, which only `withdraw` does.
            Ok(Err(_)) => false,
            Err(_elapsed) => {
                let withdrawn = ticket.withdraw();
                if !withdrawn {
                    debug!(waiter = %ticket.id(), "timer fired after release; reporting change");
                }
                !withdrawn
            }
        };

        trace!(waiter = %ticket.id(), changed, "poll resolved");
        self.outcome(changed)
    }

    fn outcome(&self, changed: bool) -> PollOutcome {
        PollOutcome {
            changed,
            timestamp: self.register.last_change_at(),
        }
    }
}
