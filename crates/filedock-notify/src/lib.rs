//! FileDock Notify - Change notification for long-polling clients
//!
//! Provides:
//! - `ChangeRegister`: last-change timestamp plus the set of suspended polls
//! - `LongPoll`: resolves a poll immediately when stale, otherwise waits for
//!   the next `ChangeRegister::notify` or the timeout
//!
//! The register is in-memory and per-process. Several server processes
//! sharing one storage root would each only see their own mutations.

pub mod poll;
pub mod register;

pub use poll::{LongPoll, PollOutcome, DEFAULT_POLL_TIMEOUT};
pub use register::{
    now_millis, ChangeRegister, NotifyOutcome, PendingWaiter, Registration, WaiterId,
    WaiterTicket,
};
